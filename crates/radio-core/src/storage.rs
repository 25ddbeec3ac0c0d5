//! # Storage
//! Persisted key/value settings.
//!
//! Values are addressed by a [`Namespace`] and a [`Field`]. There is one shared `settings`
//! namespace and one namespace per station slot, and every `(namespace, field)` pair maps to a
//! unique 16 bit key through [`storage_key`], so the per-slot keys never have to be listed by
//! hand.
//!
//! Reads of unset keys are not errors. The `*_or` helpers resolve them, and backend failures, to
//! the documented defaults so the caller never has to handle a missing value.
use heapless::String;

/// A group of related keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Namespace {
    /// General settings: volume, station history, timer, boot markers and WiFi credentials.
    Settings,
    /// The record of one station slot, zero based.
    Station(u8),
}

impl Namespace {
    /// Numeric namespace id, `0` for settings and `slot + 1` for stations.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Settings => 0,
            Self::Station(slot) => slot.saturating_add(1),
        }
    }
}

/// A key inside a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// Index of the station that last started streaming.
    CurrentStation,
    /// Index the stream toggle switches back to.
    PreviousStation,
    /// Volume level 0..=100.
    Volume,
    /// Persisted code of the sleep timer duration, see [`crate::TimerDuration::code`].
    TimerDuration,
    /// Sleep timer enabled, `1` or `0`.
    TimerEnabled,
    /// First boot marker. Present once the station table has been seeded.
    Initialized,
    /// Set by a power-down so the following boot starts playing right away.
    WakeOnClick,
    /// SSID of the last network entered in the captive portal.
    WifiSsid,
    /// Password of the last network entered in the captive portal.
    WifiPassword,
    /// Station display name.
    Tag,
    /// Station stream URL.
    Url,
}

impl Field {
    /// Numeric field id.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::CurrentStation => 0,
            Self::PreviousStation => 1,
            Self::Volume => 2,
            Self::TimerDuration => 3,
            Self::TimerEnabled => 4,
            Self::Initialized => 5,
            Self::WakeOnClick => 6,
            Self::WifiSsid => 7,
            Self::WifiPassword => 8,
            Self::Tag => 16,
            Self::Url => 17,
        }
    }
}

/// The flat key a `(namespace, field)` pair is stored under.
#[must_use]
pub const fn storage_key(namespace: Namespace, field: Field) -> u16 {
    ((namespace.id() as u16) << 8) | field.id() as u16
}

/// Longest string value the store hands back, enough for a WPA2 passphrase.
pub const MAX_VALUE_LEN: usize = 64;

/// Failure of the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The flash driver reported an error.
    Backend,
    /// The stored data could not be interpreted.
    Corrupted,
    /// The storage area is full.
    Full,
}

/// Copies `text` into a bounded string, cutting at the last char boundary that fits.
///
/// The same function is used before writing and after reading, so a value that was cut on
/// the way in reads back identical.
#[must_use]
pub fn bounded<const N: usize>(text: &str) -> String<N> {
    let mut end = text.len().min(N);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // cannot fail, `end <= N`
    let _ = out.push_str(&text[..end]);
    out
}

/// Persisted key/value store.
pub trait KeyValueStore {
    /// Reads an integer, `None` when the key was never written.
    async fn get_int(&mut self, namespace: Namespace, field: Field) -> Result<Option<i32>, StorageError>;

    /// Writes an integer.
    async fn put_int(&mut self, namespace: Namespace, field: Field, value: i32) -> Result<(), StorageError>;

    /// Reads a string, `None` when the key was never written.
    async fn get_string(
        &mut self,
        namespace: Namespace,
        field: Field,
    ) -> Result<Option<String<MAX_VALUE_LEN>>, StorageError>;

    /// Writes a string.
    async fn put_string(&mut self, namespace: Namespace, field: Field, value: &str) -> Result<(), StorageError>;

    /// Whether a value exists under the key.
    async fn has_key(&mut self, namespace: Namespace, field: Field) -> Result<bool, StorageError>;

    /// Removes every stored value.
    async fn erase_all(&mut self) -> Result<(), StorageError>;

    /// Reads an integer, falling back to `default` for unset keys and read failures.
    async fn int_or(&mut self, namespace: Namespace, field: Field, default: i32) -> i32 {
        match self.get_int(namespace, field).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read {:?}/{:?}: {:?}", namespace, field, e);
                default
            }
        }
    }

    /// Reads a string, falling back to the empty string for unset keys and read failures.
    async fn string_or_empty<const N: usize>(&mut self, namespace: Namespace, field: Field) -> String<N> {
        match self.get_string(namespace, field).await {
            Ok(Some(value)) => bounded(&value),
            Ok(None) => String::new(),
            Err(e) => {
                warn!("Failed to read {:?}/{:?}: {:?}", namespace, field, e);
                String::new()
            }
        }
    }

    /// Writes an integer, logging a failure instead of returning it.
    async fn store_int(&mut self, namespace: Namespace, field: Field, value: i32) {
        if let Err(e) = self.put_int(namespace, field, value).await {
            warn!("Failed to store {:?}/{:?} = {}: {:?}", namespace, field, value, e);
        }
    }

    /// Writes a string, logging a failure instead of returning it.
    async fn store_string(&mut self, namespace: Namespace, field: Field, value: &str) {
        if let Err(e) = self.put_string(namespace, field, value).await {
            warn!("Failed to store {:?}/{:?}: {:?}", namespace, field, e);
        }
    }

    /// Whether the key exists, treating read failures as absent.
    async fn contains(&mut self, namespace: Namespace, field: Field) -> bool {
        match self.has_key(namespace, field).await {
            Ok(present) => present,
            Err(e) => {
                warn!("Failed to probe {:?}/{:?}: {:?}", namespace, field, e);
                false
            }
        }
    }
}
