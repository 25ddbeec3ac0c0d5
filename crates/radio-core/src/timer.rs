//! # Sleep timer
//! The auto-shutoff timer: a fixed list of durations plus a disabled state, its persisted form,
//! and the remaining time text shown on the status screen.
use core::fmt::Write;

use heapless::String;

use crate::clock::elapsed;
use crate::storage::{Field, KeyValueStore, Namespace};

/// Milliseconds in one hour.
const MS_PER_HOUR: u32 = 3_600_000;

/// The selectable timer durations, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerDuration {
    /// One hour.
    OneHour,
    /// Two hours.
    TwoHours,
    /// Four hours.
    FourHours,
    /// Six hours.
    SixHours,
    /// Eight hours.
    EightHours,
    /// Twelve hours.
    TwelveHours,
}

impl TimerDuration {
    /// Decodes the persisted code. Unknown codes fall back to one hour.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::TwoHours,
            2 => Self::FourHours,
            3 => Self::SixHours,
            4 => Self::EightHours,
            5 => Self::TwelveHours,
            _ => Self::OneHour,
        }
    }

    /// The persisted code, `0` for one hour up to `5` for twelve hours.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::OneHour => 0,
            Self::TwoHours => 1,
            Self::FourHours => 2,
            Self::SixHours => 3,
            Self::EightHours => 4,
            Self::TwelveHours => 5,
        }
    }

    /// Length in hours.
    #[must_use]
    pub const fn hours(self) -> u32 {
        match self {
            Self::OneHour => 1,
            Self::TwoHours => 2,
            Self::FourHours => 4,
            Self::SixHours => 6,
            Self::EightHours => 8,
            Self::TwelveHours => 12,
        }
    }

    /// Length in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.hours() * MS_PER_HOUR
    }

    /// The next longer duration, `None` after the longest.
    #[must_use]
    pub const fn longer(self) -> Option<Self> {
        match self {
            Self::OneHour => Some(Self::TwoHours),
            Self::TwoHours => Some(Self::FourHours),
            Self::FourHours => Some(Self::SixHours),
            Self::SixHours => Some(Self::EightHours),
            Self::EightHours => Some(Self::TwelveHours),
            Self::TwelveHours => None,
        }
    }
}

/// Whether the timer runs and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerSetting {
    /// The timer counts down and puts the radio to sleep when it runs out.
    pub enabled: bool,
    /// Selected duration. Kept while disabled so it can be shown.
    pub duration: TimerDuration,
}

impl Default for TimerSetting {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl TimerSetting {
    /// Timer off.
    pub const DISABLED: Self = Self {
        enabled: false,
        duration: TimerDuration::OneHour,
    };

    /// Timer on with `duration`.
    #[must_use]
    pub const fn enabled(duration: TimerDuration) -> Self {
        Self {
            enabled: true,
            duration,
        }
    }

    /// Next step of the setup cycle: disabled, 1h, 2h, 4h, 6h, 8h, 12h, disabled again.
    #[must_use]
    pub const fn next(self) -> Self {
        if !self.enabled {
            return Self::enabled(TimerDuration::OneHour);
        }
        match self.duration.longer() {
            Some(duration) => Self::enabled(duration),
            None => Self::DISABLED,
        }
    }

    /// Reads the persisted setting. Unset keys read as disabled, one hour.
    pub async fn load<S: KeyValueStore>(store: &mut S) -> Self {
        let enabled = store.int_or(Namespace::Settings, Field::TimerEnabled, 0).await == 1;
        let duration = TimerDuration::from_code(store.int_or(Namespace::Settings, Field::TimerDuration, 0).await);
        Self { enabled, duration }
    }

    /// Persists the setting. The duration is only written while enabled.
    pub async fn save<S: KeyValueStore>(self, store: &mut S) {
        if self.enabled {
            store
                .store_int(Namespace::Settings, Field::TimerDuration, self.duration.code())
                .await;
            store.store_int(Namespace::Settings, Field::TimerEnabled, 1).await;
        } else {
            store.store_int(Namespace::Settings, Field::TimerEnabled, 0).await;
        }
    }

    /// Whether the timer is enabled and has run out, counting from `started_at`.
    #[must_use]
    pub const fn has_expired(self, now: u32, started_at: u32) -> bool {
        self.enabled && elapsed(now, started_at) > self.duration.as_millis()
    }
}

/// Time left as shown on the status screen: `N mins` below one hour, otherwise `H:MM` with the
/// hour right aligned in two columns.
#[must_use]
pub fn time_left_text(duration: TimerDuration, now: u32, started_at: u32) -> String<10> {
    let total_seconds = (duration.as_millis() / 1000).saturating_sub(elapsed(now, started_at) / 1000);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;

    let mut text = String::new();
    // fits: at most "12:00" or "59 mins"
    let _ = if hours < 1 {
        write!(text, "{minutes} mins")
    } else {
        write!(text, "{hours:2}:{minutes:02}")
    };
    text
}
