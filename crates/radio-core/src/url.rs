//! Stream URL parsing. Only plain `http://host[:port][/path]` is accepted.
use crate::station::ACCEPTED_SCHEME;

/// Port used when the URL names none.
pub const DEFAULT_PORT: u16 = 80;

/// Why a stream URL was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UrlError {
    /// The URL does not start with `http://`.
    UnsupportedScheme,
    /// The host part is empty.
    MissingHost,
    /// The port is not a number in `1..=65535`.
    InvalidPort,
}

/// The parts of a stream URL needed to open the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpUrl<'a> {
    /// Host name or dotted address.
    pub host: &'a str,
    /// TCP port.
    pub port: u16,
    /// Request path, always starting with `/`.
    pub path: &'a str,
}

impl<'a> HttpUrl<'a> {
    /// Splits `url` into host, port and path.
    ///
    /// # Errors
    /// See [`UrlError`].
    pub fn parse(url: &'a str) -> Result<Self, UrlError> {
        let rest = url
            .strip_prefix(ACCEPTED_SCHEME)
            .ok_or(UrlError::UnsupportedScheme)?;
        let (authority, path) = rest.find('/').map_or((rest, "/"), |at| rest.split_at(at));
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| UrlError::InvalidPort)?;
                if port == 0 {
                    return Err(UrlError::InvalidPort);
                }
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(UrlError::MissingHost);
        }
        Ok(Self { host, port, path })
    }
}
