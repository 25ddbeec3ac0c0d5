//! Screens drawn by the state machine. Each function clears the display and writes one screen,
//! except where noted.
use core::fmt::Write;
use core::net::Ipv4Addr;

use heapless::String;

use super::{COLUMNS, TextDisplay};
use crate::station::{StationStore, next_index, previous_index};
use crate::timer::TimerSetting;

/// Titles at least this long are shown without the heading so more of the title fits.
const HEADING_SUPPRESS_LEN: usize = (COLUMNS - 3) * 3;

/// Scratch line for formatted output.
type Line = String<32>;

/// Word quality for a received signal strength.
#[must_use]
pub const fn signal_quality(dbm: i32) -> &'static str {
    if dbm >= -30 {
        "excellent"
    } else if dbm >= -67 {
        "good"
    } else if dbm >= -70 {
        "fair"
    } else if dbm >= -80 {
        "weak"
    } else {
        "very weak"
    }
}

/// What the status screen shows.
pub struct StatusView<'a> {
    /// Name of the current station.
    pub tag: &'a str,
    /// Remaining sleep timer time, `None` while the timer is off.
    pub time_left: Option<&'a str>,
    /// Received signal strength in dBm.
    pub rssi: i32,
    /// Volume level.
    pub volume: u8,
}

/// Station, timer, signal and volume. At volume zero, the power-down hint instead.
pub fn status<D: TextDisplay>(display: &mut D, view: &StatusView<'_>) {
    display.clear();
    if view.volume == 0 {
        display.println("ZERO FUNCTION");
        display.println("Click for Timer");
        display.println("  or");
        display.print("Wait for Shutdown");
        return;
    }
    let mut line = Line::new();
    display.println(view.tag);
    if let Some(left) = view.time_left {
        display.print("timer : ");
        display.println(left);
    }
    let _ = write!(line, "signal: {} {}", view.rssi, signal_quality(view.rssi));
    display.println(&line);
    line.clear();
    let _ = write!(line, "volume: {}", view.volume);
    display.print(&line);
}

/// Writes a station name, or its 1-based slot number when the URL fails the protocol check.
fn station_line<D: TextDisplay>(display: &mut D, stations: &StationStore, index: usize) {
    let station = stations.get(index);
    if station.has_valid_protocol() {
        display.print(&station.tag);
    } else {
        let mut number = Line::new();
        let _ = write!(number, "{}", index + 1);
        display.print(&number);
    }
}

/// Station menu: the current station as title, then either the toggle target or the
/// previous, highlighted and next entries around the cursor.
pub fn menu<D: TextDisplay>(
    display: &mut D,
    stations: &StationStore,
    current: usize,
    cursor: usize,
    toggle_target: Option<usize>,
) {
    display.clear();
    display.println(&stations.get(current).tag);
    if let Some(target) = toggle_target {
        display.println("");
        display.print("> ");
        station_line(display, stations, target);
        return;
    }
    station_line(display, stations, previous_index(cursor));
    display.println("");
    // a slot number is never highlighted
    display.set_invert(stations.is_valid_url(cursor));
    station_line(display, stations, cursor);
    display.set_invert(false);
    display.println("");
    station_line(display, stations, next_index(cursor));
}

/// `Enabled`/`Disabled`, plus the duration line when enabled.
fn timer_lines<D: TextDisplay>(display: &mut D, setting: TimerSetting) {
    if setting.enabled {
        display.println("Enabled");
        duration_line(display, setting);
    } else {
        display.println("Disabled");
    }
}

/// `N hour`.
fn duration_line<D: TextDisplay>(display: &mut D, setting: TimerSetting) {
    let mut line = Line::new();
    let _ = write!(line, "{} hour", setting.duration.hours());
    display.println(&line);
}

/// Entry into timer setup, showing the persisted setting.
pub fn timer_setup<D: TextDisplay>(display: &mut D, persisted: TimerSetting) {
    display.clear();
    display.println("TIMER");
    timer_lines(display, persisted);
}

/// The pending choice while turning the knob in timer setup.
pub fn timer_choice<D: TextDisplay>(display: &mut D, pending: TimerSetting) {
    display.clear();
    display.println("SET TIMER");
    display.println("");
    if pending.enabled {
        duration_line(display, pending);
    } else {
        display.println("Disabled");
    }
}

/// Confirmation after committing timer setup.
pub fn timer_saved<D: TextDisplay>(display: &mut D, saved: TimerSetting) {
    display.clear();
    display.println("TIMER SAVED");
    if saved.enabled {
        duration_line(display, saved);
    } else {
        display.println("Disabled");
    }
}

/// Timer setup abandoned by the display timeout, showing the restored setting.
pub fn timer_not_changed<D: TextDisplay>(display: &mut D, restored: TimerSetting) {
    display.clear();
    display.println("TIMER");
    display.println("Not Changed");
    timer_lines(display, restored);
}

/// Calls `emit` with each line of `text` wrapped at `width` columns without breaking words.
/// Words longer than a line get a line of their own.
pub fn wrap_words(text: &str, width: usize, mut emit: impl FnMut(&str)) {
    let mut line: String<64> = String::new();
    for word in text.split(' ').filter(|word| !word.is_empty()) {
        if !line.is_empty() && line.len() + word.len() < width && line.push(' ').is_ok() {
            let _ = line.push_str(word);
            continue;
        }
        if line.is_empty() && word.len() <= width {
            let _ = line.push_str(word);
            continue;
        }
        if !line.is_empty() {
            emit(&line);
            line.clear();
        }
        if line.push_str(word).is_err() {
            emit(word);
        }
    }
    if !line.is_empty() {
        emit(&line);
    }
}

/// The now-playing title. Leaves the display blank and returns `false` when there is no title.
pub fn now_playing<D: TextDisplay>(display: &mut D, title: &str) -> bool {
    display.clear();
    if title.is_empty() {
        return false;
    }
    if title.len() < HEADING_SUPPRESS_LEN {
        display.println("NOW PLAYING");
    }
    wrap_words(title, COLUMNS, |line| display.println(line));
    true
}

/// Configuration portal address.
pub fn portal_open<D: TextDisplay>(display: &mut D, ip: Option<Ipv4Addr>) {
    display.clear();
    display.println("PORTAL OPEN");
    let mut line = Line::new();
    match ip {
        Some(ip) => {
            let _ = write!(line, "{ip}/param");
        }
        None => {
            let _ = line.push_str("no address");
        }
    }
    display.println(&line);
}

/// WiFi credential portal instructions.
pub fn wifi_portal<D: TextDisplay>(display: &mut D, portal_name: &str) {
    display.clear();
    display.println("WIFI PORTAL");
    display.println("Configure at");
    display.print("ssid: ");
    display.println(portal_name);
    display.println("ip:   192.168.4.1");
}

/// Boot banner.
pub fn splash<D: TextDisplay>(display: &mut D, name: &str, sleeping: bool) {
    display.clear();
    display.println(name);
    display.println("");
    display.println("");
    if sleeping {
        display.println("Turn Knob to Play");
    }
}

/// Power-down notice.
pub fn power_down<D: TextDisplay>(display: &mut D, version: &str) {
    display.clear();
    display.println("SYSTEM POWER DOWN");
    display.println("Click to Restart");
    display.println("");
    display.print("v.");
    display.print(version);
}

/// A short message of one or more `\n` separated lines.
pub fn message<D: TextDisplay>(display: &mut D, text: &str) {
    display.clear();
    display.println(text);
}
