//! Tasks that make up the radio as well as the resources they use.
pub mod audio;
pub mod display;
pub mod knob;
pub mod network;
pub mod portal;
pub mod power;
pub mod resources;
pub mod storage;
