//! # Portal server
//! The HTTP server behind the station editor. It runs while the control loop keeps the portal
//! up and serves the form at `/` and `/param`; a POST to `/param` edits the shared copy of the
//! form and raises the save flag the control loop polls.
//!
//! Bodies are applied in pieces cut at `&` to a private copy, which replaces the shared form
//! only once the whole body arrived.
use defmt::{Format, info, warn};
use embassy_net::Stack;
use embassy_net::tcp::TcpSocket;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex, signal::Signal};
use embassy_time::{Duration, with_timeout};
use embedded_io_async::Write;
use heapless::String;
use portable_atomic::{AtomicBool, Ordering};
use radio_core::portal::html::{write_page_end, write_page_start, write_station_row};
use radio_core::portal::http::{
    BodyError, MAX_REQUEST_HEAD, NOT_FOUND, PAGE_HEAD, RequestError, RequestHead, Route, parse_request_head, receive_form,
};
use radio_core::station::STATION_SLOTS;
use radio_core::{StationForm, WebPortal};

/// TCP port of the portal and the captive portal.
pub const HTTP_PORT: u16 = 80;

/// Title of the station editor page.
const PAGE_TITLE: &str = "Stream Radio Stations";

/// How long an accept waits before the running flag is looked at again.
const ACCEPT_POLL: Duration = Duration::from_secs(1);

/// Idle timeout of one client connection.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Size of the request buffer, a head plus a piece of body.
pub const REQUEST_BUFFER_LEN: usize = MAX_REQUEST_HEAD + 512;

/// The form being edited, shared between the control loop and the server
static FORM: Mutex<CriticalSectionRawMutex, Option<StationForm>> = Mutex::new(None);

/// Whether the server should accept connections
static RUNNING: AtomicBool = AtomicBool::new(false);

/// Set by the server when a form was submitted
static SUBMITTED: AtomicBool = AtomicBool::new(false);

/// Signal for starting the server
static START_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Why serving a client failed.
#[derive(Debug, Format)]
pub enum ServeError {
    /// The connection failed.
    Tcp(embassy_net::tcp::Error),
    /// The request could not be read.
    Request(RequestError),
    /// The client closed the connection early.
    Closed,
    /// A page did not fit its buffer.
    Render,
}

impl From<embassy_net::tcp::Error> for ServeError {
    fn from(e: embassy_net::tcp::Error) -> Self {
        Self::Tcp(e)
    }
}

impl From<BodyError<embassy_net::tcp::Error>> for ServeError {
    fn from(e: BodyError<embassy_net::tcp::Error>) -> Self {
        match e {
            BodyError::Read(e) => Self::Tcp(e),
            BodyError::Closed => Self::Closed,
        }
    }
}

/// The control loop's handle on the server.
pub struct HttpPortal;

impl WebPortal for HttpPortal {
    async fn start(&mut self, form: &StationForm) {
        *FORM.lock().await = Some(form.clone());
        SUBMITTED.store(false, Ordering::Release);
        RUNNING.store(true, Ordering::Release);
        START_SIGNAL.signal(());
    }

    async fn stop(&mut self) {
        RUNNING.store(false, Ordering::Release);
    }

    async fn process(&mut self, form: &mut StationForm) -> bool {
        if !SUBMITTED.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(submitted) = FORM.lock().await.as_ref() {
            form.clone_from(submitted);
        }
        true
    }
}

/// Reads until the request head is complete. Returns the head and the number of bytes in
/// `buf`, which may already hold the start of the body.
pub async fn read_request_head(socket: &mut TcpSocket<'_>, buf: &mut [u8]) -> Result<(RequestHead, usize), ServeError> {
    let mut filled = 0;
    loop {
        if filled == buf.len() {
            return Err(ServeError::Request(RequestError::TooLong));
        }
        let n = socket.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(ServeError::Closed);
        }
        filled += n;
        if let Some(head) = parse_request_head(&buf[..filled]).map_err(ServeError::Request)? {
            return Ok((head, filled));
        }
    }
}

/// Writes the station editor page.
async fn send_form_page(socket: &mut TcpSocket<'_>, form: &StationForm, saved: bool) -> Result<(), ServeError> {
    socket.write_all(PAGE_HEAD).await?;
    let mut chunk: String<512> = String::new();
    write_page_start(&mut chunk, PAGE_TITLE, saved).map_err(|_| ServeError::Render)?;
    socket.write_all(chunk.as_bytes()).await?;
    for slot in 0..STATION_SLOTS {
        chunk.clear();
        write_station_row(&mut chunk, slot, form.field(slot)).map_err(|_| ServeError::Render)?;
        socket.write_all(chunk.as_bytes()).await?;
    }
    chunk.clear();
    write_page_end(&mut chunk).map_err(|_| ServeError::Render)?;
    socket.write_all(chunk.as_bytes()).await?;
    Ok(())
}

/// Serves one request.
async fn serve(socket: &mut TcpSocket<'_>, buf: &mut [u8]) -> Result<(), ServeError> {
    let (head, filled) = read_request_head(socket, buf).await?;
    info!("Portal request {:?}", head.route);
    match head.route {
        Route::Form => {
            let form = FORM.lock().await.clone();
            match form {
                Some(form) => send_form_page(socket, &form, false).await,
                None => Ok(socket.write_all(NOT_FOUND).await?),
            }
        }
        Route::Save => {
            buf.copy_within(head.len..filled, 0);
            let current = FORM.lock().await.clone();
            let Some(current) = current else {
                return Ok(socket.write_all(NOT_FOUND).await?);
            };
            let saved = receive_form(socket, buf, filled - head.len, head.content_length, &current).await?;
            *FORM.lock().await = Some(saved.clone());
            SUBMITTED.store(true, Ordering::Release);
            send_form_page(socket, &saved, true).await
        }
        Route::Credentials | Route::NotFound => Ok(socket.write_all(NOT_FOUND).await?),
    }
}

/// Accepts portal clients while the control loop keeps the portal up.
#[embassy_executor::task]
pub async fn portal_task(stack: Stack<'static>) -> ! {
    let mut rx_buffer = [0; 1024];
    let mut tx_buffer = [0; 2048];
    let mut request = [0; REQUEST_BUFFER_LEN];
    loop {
        START_SIGNAL.wait().await;
        info!("Portal server up on port {}", HTTP_PORT);
        while RUNNING.load(Ordering::Acquire) {
            let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
            socket.set_timeout(Some(CLIENT_TIMEOUT));
            match with_timeout(ACCEPT_POLL, socket.accept(HTTP_PORT)).await {
                Err(_) => continue,
                Ok(Err(e)) => {
                    warn!("Portal accept failed: {:?}", e);
                    continue;
                }
                Ok(Ok(())) => {}
            }
            if let Err(e) = serve(&mut socket, &mut request).await {
                warn!("Portal request failed: {:?}", e);
            }
            socket.close();
            let _ = socket.flush().await;
        }
        info!("Portal server down");
    }
}

/// Renders a page into a fixed buffer.
pub fn render<const N: usize>(page: impl FnOnce(&mut String<N>) -> core::fmt::Result) -> Result<String<N>, ServeError> {
    let mut out = String::new();
    page(&mut out).map_err(|_| ServeError::Render)?;
    Ok(out)
}

/// Writes a rendered page with its response head.
pub async fn send_page<const N: usize>(socket: &mut TcpSocket<'_>, page: &String<N>) -> Result<(), ServeError> {
    socket.write_all(PAGE_HEAD).await?;
    socket.write_all(page.as_bytes()).await?;
    Ok(())
}
