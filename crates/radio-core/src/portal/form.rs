use core::fmt::Write;

use heapless::{String, Vec};

#[cfg(test)]
use crate::station::ELEMENT_LEN;
use crate::station::{STATION_SLOTS, Station, StationStore};
use crate::storage::bounded;

/// Longest form field name, `t35` or `u35`.
type FieldName = String<4>;

/// Name of the tag field of a slot.
#[must_use]
pub fn tag_field_name(slot: usize) -> FieldName {
    let mut name = FieldName::new();
    let _ = write!(name, "t{slot}");
    name
}

/// Name of the URL field of a slot.
#[must_use]
pub fn url_field_name(slot: usize) -> FieldName {
    let mut name = FieldName::new();
    let _ = write!(name, "u{slot}");
    name
}

/// Editable copy of the station ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationForm {
    /// One entry per slot.
    fields: [Station; STATION_SLOTS],
}

impl StationForm {
    /// A form seeded from the current stations.
    #[must_use]
    pub fn from_stations(stations: &StationStore) -> Self {
        Self {
            fields: core::array::from_fn(|slot| stations.get(slot).clone()),
        }
    }

    /// The entry of one slot.
    #[must_use]
    pub fn field(&self, slot: usize) -> &Station {
        &self.fields[slot % STATION_SLOTS]
    }

    /// `(tag, url)` pairs in slot order, the shape [`StationStore::set_all`] takes.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|s| (s.tag.as_str(), s.url.as_str()))
    }

    /// Applies an `application/x-www-form-urlencoded` body. Unknown fields are ignored, known
    /// fields are cut to the element bound. Returns the number of fields applied.
    pub fn apply_urlencoded(&mut self, body: &str) -> usize {
        let mut applied = 0;
        for pair in body.split('&') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let Some((kind, slot)) = name.split_at_checked(1) else {
                continue;
            };
            let Some(station) = slot
                .parse::<usize>()
                .ok()
                .and_then(|slot| self.fields.get_mut(slot))
            else {
                continue;
            };
            let decoded = percent_decode(value);
            match kind {
                "t" => station.tag = decoded,
                "u" => station.url = decoded,
                _ => continue,
            }
            applied += 1;
        }
        applied
    }

    /// Applies a body that arrives in pieces. `pending[..len]` holds bytes received but not
    /// yet applied. Everything before its last `&` is applied and the rest moves to the
    /// front; with `last` set all of it is applied. A field that fills the whole buffer
    /// without an `&` cannot be valid and is dropped. Returns the bytes left pending.
    pub fn apply_urlencoded_piece(&mut self, pending: &mut [u8], len: usize, last: bool) -> usize {
        let cut = if last {
            len
        } else {
            match pending[..len].iter().rposition(|&b| b == b'&') {
                Some(at) => at,
                None if len == pending.len() => return 0,
                None => return len,
            }
        };
        if let Ok(fields) = core::str::from_utf8(&pending[..cut]) {
            self.apply_urlencoded(fields);
        }
        let rest = (cut + 1).min(len);
        pending.copy_within(rest..len, 0);
        len - rest
    }
}

/// Value of a hex digit.
fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).and_then(|v| u8::try_from(v).ok())
}

/// Decodes `+` and `%XX` escapes, cutting the result to `N` bytes on a char boundary.
/// Malformed escapes are kept literally.
#[must_use]
pub fn percent_decode<const N: usize>(value: &str) -> String<N> {
    let mut bytes: Vec<u8, N> = Vec::new();
    let raw = value.as_bytes();
    let mut at = 0;
    while at < raw.len() && !bytes.is_full() {
        let byte = match raw[at] {
            b'+' => b' ',
            b'%' if at + 2 < raw.len() => {
                match (hex_value(raw[at + 1]), hex_value(raw[at + 2])) {
                    (Some(high), Some(low)) => {
                        at += 2;
                        (high << 4) | low
                    }
                    _ => b'%',
                }
            }
            other => other,
        };
        let _ = bytes.push(byte);
        at += 1;
    }
    let text = match core::str::from_utf8(&bytes) {
        Ok(text) => text,
        // a multi-byte char cut by the buffer bound
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    };
    bounded(text)
}
