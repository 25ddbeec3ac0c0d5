//! # Clock
//! Monotonic millisecond time. The counter is 32 bits wide and wraps after about 49 days, so
//! all comparisons go through [`elapsed`], which stays correct across the wrap.

/// Millisecond time source used by the state machine.
pub trait Clock {
    /// Milliseconds since boot, wrapping at `u32::MAX`.
    fn now_ms(&self) -> u32;

    /// Waits for `ms` milliseconds. Only used on the boot and power-down paths, where the
    /// state machine shows a message and deliberately holds it on screen.
    async fn delay_ms(&self, ms: u32);
}

/// Milliseconds from `since` to `now`, correct across one wrap of the counter.
#[must_use]
pub const fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Whether more than `window` milliseconds have passed since `since`.
#[must_use]
pub const fn expired(now: u32, since: u32, window: u32) -> bool {
    elapsed(now, since) > window
}
