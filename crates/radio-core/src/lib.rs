//! # Radio core
//! Hardware independent part of the stream radio: the interaction state machine that runs once
//! per tick, the station store, the sleep timer, the encoder counter, the text screens, the
//! configuration portal arbitration and the ICY stream helpers.
//!
//! Everything that touches hardware is reached through the collaborator traits in this crate
//! ([`KeyValueStore`], [`InputDevice`], [`TextDisplay`], [`AudioPipeline`], [`Network`],
//! [`WebPortal`], [`PowerControl`], [`Clock`]), so the whole state machine runs on the host in
//! tests and on the Pico W in the firmware.
#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

#[macro_use]
mod log;

pub mod audio;
pub mod clock;
pub mod display;
pub mod encoder;
pub mod icy;
pub mod input;
pub mod network;
pub mod portal;
pub mod power;
pub mod radio;
pub mod station;
pub mod storage;
pub mod timer;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::{AudioPipeline, Metadata, MetadataKind};
pub use clock::Clock;
pub use display::TextDisplay;
pub use encoder::EncoderCounter;
pub use input::{InputDevice, LiveSignals};
pub use network::{Network, WifiCredentials};
pub use portal::{PortalMode, StationForm, WebPortal};
pub use power::PowerControl;
pub use radio::{BootConfig, BootError, BootOptions, Devices, Platform, Radio, TickOutcome};
pub use station::{Station, StationStore};
pub use storage::{Field, KeyValueStore, Namespace, StorageError};
pub use timer::{TimerDuration, TimerSetting};
