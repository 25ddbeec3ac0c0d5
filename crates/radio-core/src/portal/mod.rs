//! # Configuration portal
//! The station editor served over HTTP while the portal switch is held.
//!
//! The control loop owns the [`StationForm`] and the [`PortalMode`]. The web server behind
//! [`WebPortal`] only edits a copy of the form and raises a save flag, so station data is only
//! ever written from the control loop.
mod form;
pub mod html;
pub mod http;

pub use form::{StationForm, percent_decode, tag_field_name, url_field_name};

/// Portal life cycle, driven by the level of the portal switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortalMode {
    /// No server running.
    #[default]
    Down,
    /// Serving the form.
    Up,
    /// A save was submitted and is committed on the next tick.
    SavePending,
    /// Saved while the switch is still held. Waits for the switch to be released so the
    /// portal does not start again right away.
    Idle,
}

/// The web server behind the portal.
pub trait WebPortal {
    /// Starts serving `form`.
    async fn start(&mut self, form: &StationForm);

    /// Stops serving. Safe to call when not running.
    async fn stop(&mut self);

    /// Services the server without blocking. When a save was submitted since the last call,
    /// copies the submitted fields into `form` and returns `true`.
    async fn process(&mut self, form: &mut StationForm) -> bool;
}
