//! # Audio
//! Streams MP3 over HTTP and plays it through an I2S DAC.
//!
//! [`StreamClient`] is the control loop's side: it opens the ICY connection, and every pump
//! moves a chunk from the socket through the ICY demultiplexer. Audio bytes go into a pipe,
//! metadata into a small queue. The decoder task drains the pipe, decodes MP3 frames and keeps
//! the I2S DMA fed from two alternating buffers, playing silence whenever the pipe runs dry.
use core::fmt::Write as _;
use core::mem;

use defmt::{Format, debug, info, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, Stack};
use embassy_rp::pio::Pio;
use embassy_rp::pio_programs::i2s::{PioI2sOut, PioI2sOutProgram};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, pipe::Pipe, signal::Signal};
use embassy_time::{Duration, Instant, with_timeout};
use embedded_io_async::Write;
use heapless::{Deque, String};
use portable_atomic::{AtomicU32, Ordering};
use radio_core::icy::{IcyDemux, IcyError, MAX_HEAD_LEN, parse_response_head};
use radio_core::url::{HttpUrl, UrlError};
use radio_core::{AudioPipeline, Metadata};
use static_cell::StaticCell;

use crate::task::resources::{AudioResources, Irqs};

/// Output sample rate. Streams at other rates play at the wrong pitch.
const SAMPLE_RATE: u32 = 44_100;
/// Bits per sample and channel.
const BIT_DEPTH: u32 = 16;

/// Bytes buffered between the socket and the decoder.
const PIPE_LEN: usize = 16 * 1024;
/// Bytes moved per pump.
const CHUNK_LEN: usize = 1024;
/// Receive buffer of the stream socket.
const RX_BUFFER_LEN: usize = 8 * 1024;
/// Transmit buffer of the stream socket, only the request goes out.
const TX_BUFFER_LEN: usize = 512;
/// Compressed bytes the decoder looks at per frame, a little over the largest MP3 frame.
const DECODER_INPUT_LEN: usize = 4 * 1024;
/// Silence written while starved, in stereo frames.
const SILENCE_FRAMES: usize = 256;
/// Metadata events kept until the control loop collects them.
const METADATA_QUEUE_LEN: usize = 4;

/// Timeout for DNS, connect and the response head.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
/// How long a pump waits for data.
const READ_POLL: Duration = Duration::from_millis(2);
/// A stream that delivers nothing for this long counts as closed.
const STALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Compressed audio from the stream client to the decoder
static STREAM_PIPE: Pipe<CriticalSectionRawMutex, PIPE_LEN> = Pipe::new();

/// Signal for dropping the decoder state between streams
static DECODER_RESET: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Output gain as `f32` bits
static GAIN: AtomicU32 = AtomicU32::new(0);

/// Why a stream could not be opened.
#[derive(Debug, Format)]
enum StreamError {
    /// The URL is not a plain `http://` URL.
    Url(UrlError),
    /// The host name did not resolve.
    Dns,
    /// The TCP connection failed.
    Connect,
    /// Sending the request or reading the answer failed.
    Tcp(embassy_net::tcp::Error),
    /// The server answered with something other than an audio stream.
    Icy(IcyError),
    /// The server closed the connection.
    Closed,
    /// The request line did not fit its buffer.
    RequestTooLong,
    /// A step took longer than [`CONNECT_TIMEOUT`].
    Timeout,
}

impl From<embassy_net::tcp::Error> for StreamError {
    fn from(e: embassy_net::tcp::Error) -> Self {
        Self::Tcp(e)
    }
}

/// The control loop's stream player.
pub struct StreamClient {
    /// The network stack
    stack: Stack<'static>,
    /// The one stream connection
    socket: TcpSocket<'static>,
    /// Splits the body into audio and metadata
    demux: IcyDemux,
    /// Metadata not yet collected
    metadata: Deque<Metadata, METADATA_QUEUE_LEN>,
    /// Whether a stream is open
    open: bool,
    /// When the stream last delivered data
    last_data: Instant,
}

impl StreamClient {
    /// A player with no stream open.
    pub fn new(stack: Stack<'static>) -> Self {
        static RX_BUFFER: StaticCell<[u8; RX_BUFFER_LEN]> = StaticCell::new();
        static TX_BUFFER: StaticCell<[u8; TX_BUFFER_LEN]> = StaticCell::new();
        let mut socket = TcpSocket::new(
            stack,
            RX_BUFFER.init([0; RX_BUFFER_LEN]),
            TX_BUFFER.init([0; TX_BUFFER_LEN]),
        );
        socket.set_timeout(Some(STALL_TIMEOUT));
        Self {
            stack,
            socket,
            demux: IcyDemux::new(None),
            metadata: Deque::new(),
            open: false,
            last_data: Instant::now(),
        }
    }

    /// Resolves a host name, or parses a dotted address.
    async fn resolve(&self, host: &str) -> Result<IpAddress, StreamError> {
        if let Ok(address) = host.parse::<core::net::Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(address));
        }
        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|_| StreamError::Dns)?;
        addresses.first().copied().ok_or(StreamError::Dns)
    }

    /// Feeds body bytes through the demultiplexer.
    fn feed(&mut self, body: &[u8]) {
        let Self { demux, metadata, .. } = self;
        demux.feed(
            body,
            |mut audio| {
                // the pump only reads when the pipe has room for a whole chunk
                while !audio.is_empty() {
                    match STREAM_PIPE.try_write(audio) {
                        Ok(written) => audio = &audio[written..],
                        Err(_) => break,
                    }
                }
            },
            |event| {
                if metadata.is_full() {
                    let _ = metadata.pop_front();
                }
                let _ = metadata.push_back(event);
            },
        );
    }

    /// Connects, sends the request and reads the response head.
    async fn connect(&mut self, url: &str) -> Result<(), StreamError> {
        let url = HttpUrl::parse(url).map_err(StreamError::Url)?;
        let address = self.resolve(url.host).await?;
        info!("Connecting to {}:{}", url.host, url.port);
        self.socket
            .connect((address, url.port))
            .await
            .map_err(|_| StreamError::Connect)?;

        let mut request: String<512> = String::new();
        write!(
            request,
            "GET {} HTTP/1.0\r\nHost: {}\r\nIcy-MetaData: 1\r\nUser-Agent: pico-stream-radio/{}\r\nAccept: */*\r\n\r\n",
            url.path,
            url.host,
            env!("CARGO_PKG_VERSION")
        )
        .map_err(|_| StreamError::RequestTooLong)?;
        self.socket.write_all(request.as_bytes()).await?;

        let mut head = [0u8; MAX_HEAD_LEN];
        let mut filled = 0;
        loop {
            let n = self.socket.read(&mut head[filled..]).await?;
            if n == 0 {
                return Err(StreamError::Closed);
            }
            filled += n;
            match parse_response_head(&head[..filled]).map_err(StreamError::Icy)? {
                Some(response) => {
                    info!("Stream open, metadata interval {:?}", response.metaint);
                    self.demux = IcyDemux::new(response.metaint);
                    self.feed(&head[response.len..filled]);
                    return Ok(());
                }
                None if filled == head.len() => return Err(StreamError::Icy(IcyError::HeadTooLong)),
                None => {}
            }
        }
    }
}

impl AudioPipeline for StreamClient {
    async fn begin(&mut self, url: &str) -> bool {
        if self.open {
            self.end().await;
        }
        match with_timeout(CONNECT_TIMEOUT, self.connect(url)).await {
            Ok(Ok(())) => {
                self.open = true;
                self.last_data = Instant::now();
                true
            }
            Ok(Err(e)) => {
                warn!("Stream failed: {:?}", e);
                self.socket.abort();
                false
            }
            Err(_) => {
                warn!("Stream failed: {:?}", StreamError::Timeout);
                self.socket.abort();
                false
            }
        }
    }

    async fn end(&mut self) {
        if !self.open {
            return;
        }
        info!("Stream closed");
        self.open = false;
        self.socket.abort();
        let _ = with_timeout(Duration::from_millis(200), self.socket.flush()).await;
        self.metadata.clear();
        STREAM_PIPE.clear();
        DECODER_RESET.signal(());
    }

    async fn pump(&mut self) -> bool {
        if !self.open {
            return false;
        }
        if STREAM_PIPE.free_capacity() < CHUNK_LEN {
            // the decoder is behind, the socket buffers for us
            self.last_data = Instant::now();
            return true;
        }
        let mut chunk = [0u8; CHUNK_LEN];
        match with_timeout(READ_POLL, self.socket.read(&mut chunk)).await {
            Err(_) => self.last_data.elapsed() < STALL_TIMEOUT,
            Ok(Ok(0)) => {
                warn!("Stream closed by the server");
                false
            }
            Ok(Ok(n)) => {
                self.feed(&chunk[..n]);
                self.last_data = Instant::now();
                true
            }
            Ok(Err(e)) => {
                warn!("Stream read failed: {:?}", e);
                false
            }
        }
    }

    fn set_volume(&mut self, gain: f32) {
        GAIN.store(gain.to_bits(), Ordering::Relaxed);
    }

    fn poll_metadata(&mut self) -> Option<Metadata> {
        self.metadata.pop_front()
    }
}

/// Scales a decoded sample to a 16 bit word.
#[allow(clippy::cast_possible_truncation)]
fn sample_bits(sample: f32, gain: f32) -> u32 {
    let scaled = (sample * gain * f32::from(i16::MAX)).clamp(f32::from(i16::MIN), f32::from(i16::MAX));
    u32::from((scaled as i16).cast_unsigned())
}

/// Packs decoded frames into I2S words, left channel in the low half. Returns the words written.
fn render(pcm: &[f32], frames: usize, channels: nanomp3::Channels, gain: f32, out: &mut [u32]) -> usize {
    let frames = frames.min(out.len());
    match channels {
        nanomp3::Channels::Mono => {
            for (word, &sample) in out[..frames].iter_mut().zip(pcm) {
                let s = sample_bits(sample, gain);
                *word = s | (s << 16);
            }
        }
        nanomp3::Channels::Stereo => {
            for (word, pair) in out[..frames].iter_mut().zip(pcm.chunks_exact(2)) {
                *word = sample_bits(pair[0], gain) | (sample_bits(pair[1], gain) << 16);
            }
        }
    }
    frames
}

/// Decodes the stream pipe into the I2S DAC.
#[embassy_executor::task]
pub async fn decoder_task(r: AudioResources) -> ! {
    info!("decoder task started");
    const FRAME_WORDS: usize = nanomp3::MAX_SAMPLES_PER_FRAME / 2;

    let mut pio = Pio::new(r.pio, Irqs);
    let program = PioI2sOutProgram::new(&mut pio.common);
    let mut i2s = PioI2sOut::new(
        &mut pio.common,
        pio.sm0,
        r.dma_ch,
        r.data_pin,
        r.bit_clock_pin,
        r.lr_clock_pin,
        SAMPLE_RATE,
        BIT_DEPTH,
        &program,
    );
    i2s.start();

    static DMA_BUFFER: StaticCell<[u32; FRAME_WORDS * 2]> = StaticCell::new();
    let dma_buffer = DMA_BUFFER.init([0; FRAME_WORDS * 2]);
    let (mut front, mut back) = dma_buffer.split_at_mut(FRAME_WORDS);
    let mut front_len = SILENCE_FRAMES;

    let mut decoder = nanomp3::Decoder::new();
    let mut pcm = [0f32; nanomp3::MAX_SAMPLES_PER_FRAME];
    let mut input = [0u8; DECODER_INPUT_LEN];
    let mut filled = 0;
    let mut warned_rate = false;

    loop {
        let transfer = i2s.write(&front[..front_len]);

        if DECODER_RESET.signaled() {
            DECODER_RESET.reset();
            decoder = nanomp3::Decoder::new();
            filled = 0;
            warned_rate = false;
        }
        if filled < input.len() {
            filled += STREAM_PIPE.try_read(&mut input[filled..]).unwrap_or(0);
        }

        let (consumed, info) = if filled == 0 {
            (0, None)
        } else {
            decoder.decode(&input[..filled], &mut pcm)
        };
        input.copy_within(consumed..filled, 0);
        filled -= consumed;

        let back_len = match info {
            Some(info) => {
                if info.sample_rate != SAMPLE_RATE && !warned_rate {
                    warn!("Stream sample rate {} Hz, output runs at {} Hz", info.sample_rate, SAMPLE_RATE);
                    warned_rate = true;
                }
                let gain = f32::from_bits(GAIN.load(Ordering::Relaxed));
                render(&pcm, info.samples_produced, info.channels, gain, back)
            }
            None => {
                if consumed == 0 && filled == input.len() {
                    debug!("Dropping {} undecodable bytes", filled);
                    filled = 0;
                }
                back[..SILENCE_FRAMES].fill(0);
                SILENCE_FRAMES
            }
        };

        transfer.await;
        mem::swap(&mut front, &mut back);
        front_len = back_len;
    }
}

