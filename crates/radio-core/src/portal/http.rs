//! The little HTTP/1.0 the portal server speaks.
use embedded_io_async::Read;

use super::StationForm;

/// Longest request head accepted.
pub const MAX_REQUEST_HEAD: usize = 1024;

/// Response head for a page.
pub const PAGE_HEAD: &[u8] =
    b"HTTP/1.0 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n";

/// Response for unknown paths.
pub const NOT_FOUND: &[u8] = b"HTTP/1.0 404 Not Found\r\nConnection: close\r\n\r\nnot found";

/// A request that cannot be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// The request line or a header could not be read.
    Malformed,
    /// The head did not end within [`MAX_REQUEST_HEAD`] bytes.
    TooLong,
}

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    /// `GET /` or `GET /param`: the station form.
    Form,
    /// `POST /param`: submit the station form.
    Save,
    /// `POST /wifi`: submit WiFi credentials to the captive portal.
    Credentials,
    /// Anything else.
    NotFound,
}

/// A parsed request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHead {
    /// Where the request goes.
    pub route: Route,
    /// Body length announced by `Content-Length`, zero when absent.
    pub content_length: usize,
    /// Bytes taken by the head including the blank line.
    pub len: usize,
}

/// Maps a method and path to a route. The query string is ignored.
#[must_use]
pub fn route(method: &str, target: &str) -> Route {
    let path = target.split_once('?').map_or(target, |(path, _)| path);
    match (method, path) {
        ("GET", "/" | "/param") => Route::Form,
        ("POST", "/param") => Route::Save,
        ("POST", "/wifi") => Route::Credentials,
        _ => Route::NotFound,
    }
}

/// Parses the request head at the start of `buf`. Returns `Ok(None)` while it is incomplete.
///
/// # Errors
/// See [`RequestError`].
pub fn parse_request_head(buf: &[u8]) -> Result<Option<RequestHead>, RequestError> {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return if buf.len() > MAX_REQUEST_HEAD {
            Err(RequestError::TooLong)
        } else {
            Ok(None)
        };
    };
    let head = core::str::from_utf8(&buf[..end]).map_err(|_| RequestError::Malformed)?;
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().ok_or(RequestError::Malformed)?.split(' ');
    let (Some(method), Some(target)) = (request_line.next(), request_line.next()) else {
        return Err(RequestError::Malformed);
    };

    let mut content_length = 0;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| RequestError::Malformed)?;
        }
    }
    Ok(Some(RequestHead {
        route: route(method, target),
        content_length,
        len: end + 4,
    }))
}

/// Why a request body was not received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BodyError<E> {
    /// Reading from the connection failed.
    Read(E),
    /// The connection closed before the body was complete.
    Closed,
}

/// Receives a urlencoded body of `content_length` bytes into an edited copy of `form`.
///
/// The first `already` bytes of the body are at the start of `buf`, which is reused for the
/// rest. The copy is only handed back once the whole body arrived.
pub async fn receive_form<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    already: usize,
    content_length: usize,
    form: &StationForm,
) -> Result<StationForm, BodyError<R::Error>> {
    let mut edited = form.clone();
    let mut remaining = content_length.saturating_sub(already);
    let mut pending = already.min(content_length);
    loop {
        pending = edited.apply_urlencoded_piece(buf, pending, remaining == 0);
        if remaining == 0 {
            return Ok(edited);
        }
        let room = (buf.len() - pending).min(remaining);
        let n = reader
            .read(&mut buf[pending..pending + room])
            .await
            .map_err(BodyError::Read)?;
        if n == 0 {
            return Err(BodyError::Closed);
        }
        pending += n;
        remaining -= n;
    }
}
