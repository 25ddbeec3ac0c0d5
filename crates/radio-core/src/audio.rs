//! # Audio
//! The stream player as seen by the control loop: connect, pump, stop, set the volume and
//! collect in-band metadata.
use heapless::String;

/// Longest metadata value kept.
pub const METADATA_LEN: usize = 128;

/// Kind of an in-band metadata event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MetadataKind {
    /// The title of the track now playing.
    Title,
    /// Any other key of the metadata block.
    Other,
}

/// One metadata event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// What the text is.
    pub kind: MetadataKind,
    /// The value, cut to [`METADATA_LEN`].
    pub text: String<METADATA_LEN>,
}

impl Metadata {
    /// A title event.
    #[must_use]
    pub fn title(text: &str) -> Self {
        Self {
            kind: MetadataKind::Title,
            text: crate::storage::bounded(text),
        }
    }
}

/// Network stream decoder feeding the audio output.
pub trait AudioPipeline {
    /// Connects to `url` and starts decoding. Returns whether the stream is playing.
    async fn begin(&mut self, url: &str) -> bool;

    /// Stops the stream. Safe to call when nothing is playing.
    async fn end(&mut self);

    /// Moves pending stream data towards the decoder. Returns `false` once the stream closed.
    async fn pump(&mut self) -> bool;

    /// Sets the output gain, `0.0` silent to `1.0` full scale.
    fn set_volume(&mut self, gain: f32);

    /// Takes the oldest pending metadata event.
    fn poll_metadata(&mut self) -> Option<Metadata>;
}

/// Output gain for a volume level.
#[must_use]
pub fn gain_for_volume(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}
