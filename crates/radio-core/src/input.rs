//! # Input
//! The knob, its button and the live mode signals, as seen by the control loop.

/// Lower bound of the encoder position.
pub const POSITION_MIN: i32 = 0;
/// Upper bound of the encoder position.
pub const POSITION_MAX: i32 = 100;
/// Position the encoder is parked at while the menu is open, so a reading measures the turn
/// since the last one.
pub const MENU_CENTER: i32 = 50;

/// Level and edge signals sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveSignals {
    /// The configuration portal switch is held.
    pub portal_switch: bool,
    /// Now-playing titles may be shown when the display times out.
    pub metadata_enabled: bool,
    /// The title button is held.
    pub title_requested: bool,
    /// The toggle button was pressed since the last sample.
    pub toggle_pressed: bool,
}

/// Non-blocking view of the rotary encoder and the mode inputs.
pub trait InputDevice {
    /// Whether the button was clicked since the last call. Debounced, edge triggered.
    fn poll_button_clicked(&mut self) -> bool;

    /// Whether the encoder position moved since the last call.
    fn poll_rotation_changed(&mut self) -> bool;

    /// Current encoder position.
    fn read_position(&mut self) -> i32;

    /// Moves the encoder position without raising a change.
    fn set_position(&mut self, position: i32);

    /// Reads the position and moves it to `center` in one step, so no detent is lost between
    /// the two.
    fn recenter(&mut self, center: i32) -> i32;

    /// Samples the live signals.
    fn sample_signals(&mut self) -> LiveSignals;
}
