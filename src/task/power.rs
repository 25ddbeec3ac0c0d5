//! # Power
//! Suspend, wake and restart.
//!
//! The RP2040 keeps running while the radio is powered down: the WiFi chip is already off by
//! then, and the control loop parks in [`PowerControl::suspend`] until the knob button is
//! pressed. A restart lets the hardware watchdog expire, as a cold boot would.
use defmt::{info, warn};
use embassy_rp::watchdog::Watchdog;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Instant, Timer};
use portable_atomic::{AtomicBool, Ordering};
use radio_core::{Clock, PowerControl};

use crate::task::resources::PowerResources;

/// Hardware watchdog timeout, used only for the reset itself
const HARDWARE_WATCHDOG_TIMEOUT: Duration = Duration::from_millis(100);

/// Whether a knob press should end a suspend
static WAKE_ARMED: AtomicBool = AtomicBool::new(false);

/// Signal for waking the suspended control loop
static WAKE_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Called by the knob button handler on every press. Wakes a suspended radio when armed.
pub fn signal_button_wake() {
    if WAKE_ARMED.load(Ordering::Acquire) {
        WAKE_SIGNAL.signal(());
    }
}

/// Suspend and reset through the watchdog.
pub struct WatchdogPower {
    /// The RP2040 watchdog
    watchdog: Watchdog,
}

impl WatchdogPower {
    /// Takes the watchdog.
    pub fn new(r: PowerResources) -> Self {
        Self {
            watchdog: Watchdog::new(r.watchdog),
        }
    }
}

impl PowerControl for WatchdogPower {
    fn arm_button_wake(&mut self) {
        WAKE_SIGNAL.reset();
        WAKE_ARMED.store(true, Ordering::Release);
    }

    async fn suspend(&mut self) {
        info!("Suspended, waiting for the knob button");
        WAKE_SIGNAL.wait().await;
        info!("Woken by the knob button");
    }

    fn disable_wake_sources(&mut self) {
        WAKE_ARMED.store(false, Ordering::Release);
        WAKE_SIGNAL.reset();
    }

    async fn restart(&mut self) {
        warn!(
            "Restarting, hardware watchdog fires in {}ms",
            HARDWARE_WATCHDOG_TIMEOUT.as_millis()
        );
        // start without feeding, the expiry resets the chip
        self.watchdog.pause_on_debug(false);
        self.watchdog.start(HARDWARE_WATCHDOG_TIMEOUT);
        loop {
            Timer::after_secs(1).await;
        }
    }
}

/// Milliseconds since boot from the embassy time driver.
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u32 {
        // wraps after 49 days, the state machine only compares differences
        Instant::now().as_millis() as u32
    }

    async fn delay_ms(&self, ms: u32) {
        Timer::after_millis(u64::from(ms)).await;
    }
}
