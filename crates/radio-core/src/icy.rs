//! # ICY
//! Shoutcast/Icecast response handling: the response head with its `icy-metaint` interval, and
//! the demultiplexer that splits the body into audio bytes and in-band metadata blocks.
use heapless::{String, Vec};

use crate::audio::{METADATA_LEN, Metadata, MetadataKind};

/// Longest response head accepted.
pub const MAX_HEAD_LEN: usize = 2048;

/// Metadata bytes kept per block. The title comes first, the rest of a long block is skipped.
const METADATA_KEPT: usize = 512;

/// A malformed or unwanted response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IcyError {
    /// The status line could not be read.
    Malformed,
    /// The server answered with a status other than 200.
    Status(u16),
    /// The head did not end within [`MAX_HEAD_LEN`] bytes.
    HeadTooLong,
    /// `icy-metaint` is not a positive number.
    InvalidMetaInt,
}

/// The interesting parts of a response head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    /// Bytes taken by the head including the blank line. The body starts here.
    pub len: usize,
    /// Audio bytes between metadata blocks, `None` when the server sends no metadata.
    pub metaint: Option<usize>,
}

/// Parses the response head at the start of `buf`.
///
/// Returns `Ok(None)` while the head is still incomplete.
///
/// # Errors
/// See [`IcyError`].
pub fn parse_response_head(buf: &[u8]) -> Result<Option<ResponseHead>, IcyError> {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return if buf.len() > MAX_HEAD_LEN {
            Err(IcyError::HeadTooLong)
        } else {
            Ok(None)
        };
    };
    let head = core::str::from_utf8(&buf[..end]).map_err(|_| IcyError::Malformed)?;
    let mut lines = head.split("\r\n");
    let status_line = lines.next().ok_or(IcyError::Malformed)?;
    // "ICY 200 OK" or "HTTP/1.0 200 OK"
    let status = status_line
        .split(' ')
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(IcyError::Malformed)?;
    if status != 200 {
        return Err(IcyError::Status(status));
    }

    let mut metaint = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("icy-metaint") {
            let interval = value
                .trim()
                .parse::<usize>()
                .map_err(|_| IcyError::InvalidMetaInt)?;
            if interval == 0 {
                return Err(IcyError::InvalidMetaInt);
            }
            metaint = Some(interval);
        }
    }
    Ok(Some(ResponseHead { len: end + 4, metaint }))
}

/// Where the demultiplexer is inside the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Audio bytes left before the next metadata length byte.
    Audio(usize),
    /// The next byte is the metadata length in 16 byte units.
    Length,
    /// Metadata bytes left in the current block.
    Metadata(usize),
}

/// Splits an ICY body into audio and metadata.
pub struct IcyDemux {
    /// Audio bytes between metadata blocks, `None` for a plain body.
    metaint: Option<usize>,
    /// Current position.
    position: Position,
    /// Start of the current metadata block.
    block: Vec<u8, METADATA_KEPT>,
}

impl IcyDemux {
    /// A demultiplexer for a body with the given metadata interval.
    #[must_use]
    pub const fn new(metaint: Option<usize>) -> Self {
        Self {
            metaint,
            position: Position::Audio(match metaint {
                Some(interval) => interval,
                None => usize::MAX,
            }),
            block: Vec::new(),
        }
    }

    /// Feeds body bytes. Audio runs go to `audio` in order, every non-empty metadata value
    /// goes to `metadata`.
    pub fn feed(&mut self, mut input: &[u8], mut audio: impl FnMut(&[u8]), mut metadata: impl FnMut(Metadata)) {
        while !input.is_empty() {
            match self.position {
                Position::Audio(remaining) => {
                    let take = remaining.min(input.len());
                    audio(&input[..take]);
                    input = &input[take..];
                    self.position = match self.metaint {
                        Some(_) if take == remaining => Position::Length,
                        Some(_) => Position::Audio(remaining - take),
                        None => Position::Audio(usize::MAX),
                    };
                }
                Position::Length => {
                    let len = usize::from(input[0]) * 16;
                    input = &input[1..];
                    self.block.clear();
                    self.position = if len == 0 {
                        self.audio_block()
                    } else {
                        Position::Metadata(len)
                    };
                }
                Position::Metadata(remaining) => {
                    let take = remaining.min(input.len());
                    let room = METADATA_KEPT - self.block.len();
                    let _ = self.block.extend_from_slice(&input[..take.min(room)]);
                    input = &input[take..];
                    if take == remaining {
                        parse_metadata(&self.block, &mut metadata);
                        self.position = self.audio_block();
                    } else {
                        self.position = Position::Metadata(remaining - take);
                    }
                }
            }
        }
    }

    /// The position at the start of the next audio block.
    const fn audio_block(&self) -> Position {
        match self.metaint {
            Some(interval) => Position::Audio(interval),
            None => Position::Audio(usize::MAX),
        }
    }
}

/// Position of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Decodes a metadata value cut to [`METADATA_LEN`]. Bytes that are not UTF-8 are read as
/// Latin-1, which many servers still send.
fn decode_text(bytes: &[u8]) -> String<METADATA_LEN> {
    let mut text = String::new();
    for chunk in bytes.utf8_chunks() {
        let latin1 = chunk.invalid().iter().map(|&b| char::from(b));
        for c in chunk.valid().chars().chain(latin1) {
            if text.push(c).is_err() {
                return text;
            }
        }
    }
    text
}

/// Splits a metadata block of `Key='value';` pairs into events. `StreamTitle` becomes a title
/// event, other keys become [`MetadataKind::Other`] events.
pub fn parse_metadata(block: &[u8], mut emit: impl FnMut(Metadata)) {
    let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
    let mut rest = &block[..end];
    while let Some(at) = find(rest, b"='") {
        let (key, after) = (&rest[..at], &rest[at + 2..]);
        // values may contain a quote, only a quote followed by `;` ends one
        let (value, tail) = match find(after, b"';") {
            Some(close) => (&after[..close], &after[close + 2..]),
            None => (after.strip_suffix(b"'").unwrap_or(after), &after[after.len()..]),
        };
        let start = key.iter().position(|&b| b != b';').unwrap_or(key.len());
        if !value.is_empty() {
            let kind = if key[start..].trim_ascii() == b"StreamTitle" {
                MetadataKind::Title
            } else {
                MetadataKind::Other
            };
            emit(Metadata {
                kind,
                text: decode_text(value),
            });
        }
        rest = tail;
    }
}
