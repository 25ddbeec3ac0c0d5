//! Power-down sleep and restart.

/// CPU suspend and reset.
pub trait PowerControl {
    /// Arms the button edge as the only wake source.
    fn arm_button_wake(&mut self);

    /// Halts until the armed wake source fires.
    async fn suspend(&mut self);

    /// Clears all wake sources.
    fn disable_wake_sources(&mut self);

    /// Resets the device. On hardware this does not return.
    async fn restart(&mut self);
}
