//! # Stations
//! The ring of station presets and its persistence.
//!
//! The ring always holds [`STATION_SLOTS`] entries. Empty or malformed entries stay in the ring;
//! they fail the protocol check and are shown by slot number instead of by name.
mod defaults;

pub use defaults::DEFAULT_STATIONS;

use heapless::String;

use crate::storage::{Field, KeyValueStore, Namespace, bounded};

/// Number of station slots.
pub const STATION_SLOTS: usize = 36;

/// Longest tag or URL in bytes.
pub const ELEMENT_LEN: usize = 49;

/// The only accepted URL scheme.
pub const ACCEPTED_SCHEME: &str = "http://";

/// A tag or URL of a station.
pub type StationText = String<ELEMENT_LEN>;

/// A named stream source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Station {
    /// Display name.
    pub tag: StationText,
    /// Stream URL.
    pub url: StationText,
}

impl Station {
    /// Builds a station, cutting both strings to [`ELEMENT_LEN`] bytes.
    #[must_use]
    pub fn new(tag: &str, url: &str) -> Self {
        Self {
            tag: bounded(tag),
            url: bounded(url),
        }
    }

    /// Whether the URL starts with the accepted scheme.
    #[must_use]
    pub fn has_valid_protocol(&self) -> bool {
        has_valid_protocol(&self.url)
    }
}

/// Protocol check: the cheap "is this slot populated" test.
#[must_use]
pub fn has_valid_protocol(url: &str) -> bool {
    url.starts_with(ACCEPTED_SCHEME)
}

/// Wraps any signed index into `0..STATION_SLOTS`.
#[must_use]
pub const fn wrap_index(index: i32) -> usize {
    // STATION_SLOTS fits in i32
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    let wrapped = index.rem_euclid(STATION_SLOTS as i32) as usize;
    wrapped
}

/// Index after `index`, wrapping to the first slot.
#[must_use]
pub const fn next_index(index: usize) -> usize {
    (index % STATION_SLOTS + 1) % STATION_SLOTS
}

/// Index before `index`, wrapping to the last slot.
#[must_use]
pub const fn previous_index(index: usize) -> usize {
    (index % STATION_SLOTS + STATION_SLOTS - 1) % STATION_SLOTS
}

/// The in-memory station ring.
pub struct StationStore {
    /// One entry per slot.
    stations: [Station; STATION_SLOTS],
}

impl Default for StationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StationStore {
    /// An all-empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stations: core::array::from_fn(|_| Station::default()),
        }
    }

    /// The station at `index`, taken modulo the slot count.
    #[must_use]
    pub fn get(&self, index: usize) -> &Station {
        &self.stations[index % STATION_SLOTS]
    }

    /// Replaces the whole ring. Slots without an entry become empty.
    pub fn set_all<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entries = entries.into_iter();
        for station in &mut self.stations {
            *station = entries
                .next()
                .map_or_else(Station::default, |(tag, url)| Station::new(tag, url));
        }
    }

    /// Whether the URL of the station at `index` passes the protocol check.
    #[must_use]
    pub fn is_valid_url(&self, index: usize) -> bool {
        self.get(index).has_valid_protocol()
    }

    /// Iterates the ring in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    /// Fills the ring from the store. Missing or unreadable fields become empty strings.
    pub async fn load<S: KeyValueStore>(&mut self, store: &mut S) {
        for (slot, station) in (0u8..).zip(self.stations.iter_mut()) {
            let namespace = Namespace::Station(slot);
            station.tag = store.string_or_empty(namespace, Field::Tag).await;
            station.url = store.string_or_empty(namespace, Field::Url).await;
        }
    }

    /// Writes every slot to the store.
    pub async fn persist<S: KeyValueStore>(&self, store: &mut S) {
        for (slot, station) in (0u8..).zip(self.stations.iter()) {
            let namespace = Namespace::Station(slot);
            store.store_string(namespace, Field::Tag, &station.tag).await;
            store.store_string(namespace, Field::Url, &station.url).await;
        }
        info!("Stored {} stations", STATION_SLOTS);
    }

    /// Replaces the ring with the built-in table and persists it.
    pub async fn seed_defaults<S: KeyValueStore>(&mut self, store: &mut S) {
        info!("Loading default stations");
        self.set_all(DEFAULT_STATIONS);
        self.persist(store).await;
    }

    /// Loads the ring, seeding the defaults first if the store was never initialized.
    ///
    /// Returns `true` on the first boot, when the defaults were written and the marker set.
    pub async fn populate<S: KeyValueStore>(&mut self, store: &mut S) -> bool {
        let first_boot = !store.contains(Namespace::Settings, Field::Initialized).await;
        if first_boot {
            info!("First boot, seeding the station table");
            self.seed_defaults(store).await;
            // only a complete seed counts, an interrupted one runs again
            store.store_int(Namespace::Settings, Field::Initialized, 1).await;
        }
        self.load(store).await;
        first_boot
    }
}
