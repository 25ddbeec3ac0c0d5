//! The station form page, written in pieces so the server can send it row by row.
use core::fmt::{self, Write};

use super::{tag_field_name, url_field_name};
use crate::station::{ELEMENT_LEN, Station};

/// Writes `text` with the HTML special characters escaped.
///
/// # Errors
/// When the writer runs out of room.
pub fn write_escaped<W: Write>(w: &mut W, text: &str) -> fmt::Result {
    for ch in text.chars() {
        match ch {
            '&' => w.write_str("&amp;")?,
            '<' => w.write_str("&lt;")?,
            '>' => w.write_str("&gt;")?,
            '"' => w.write_str("&quot;")?,
            '\'' => w.write_str("&#39;")?,
            _ => w.write_char(ch)?,
        }
    }
    Ok(())
}

/// Page start up to the opening form tag. `saved` adds a confirmation line.
///
/// # Errors
/// When the writer runs out of room.
pub fn write_page_start<W: Write>(w: &mut W, title: &str, saved: bool) -> fmt::Result {
    w.write_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">")?;
    w.write_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\"><title>")?;
    write_escaped(w, title)?;
    w.write_str("</title><style>body{font-family:sans-serif;margin:1em}")?;
    w.write_str("input{width:100%;box-sizing:border-box;margin-bottom:.5em}</style></head><body><h2>")?;
    write_escaped(w, title)?;
    w.write_str("</h2>")?;
    if saved {
        w.write_str("<p><b>Saved</b></p>")?;
    }
    w.write_str("<form method=\"post\" action=\"/param\">")
}

/// One input with its label.
fn write_input<W: Write>(w: &mut W, name: &str, label: fmt::Arguments<'_>, value: &str) -> fmt::Result {
    write!(
        w,
        "<label for=\"{name}\">{label}</label><input id=\"{name}\" name=\"{name}\" maxlength=\"{ELEMENT_LEN}\" value=\""
    )?;
    write_escaped(w, value)?;
    w.write_str("\">")
}

/// The two inputs of one slot, titled `Name N` and `URL_N` with `N` counted from one.
///
/// # Errors
/// When the writer runs out of room.
pub fn write_station_row<W: Write>(w: &mut W, slot: usize, station: &Station) -> fmt::Result {
    let number = slot + 1;
    write_input(w, &tag_field_name(slot), format_args!("Name {number}"), &station.tag)?;
    write_input(w, &url_field_name(slot), format_args!("URL_{number}"), &station.url)
}

/// Submit button and page end.
///
/// # Errors
/// When the writer runs out of room.
pub fn write_page_end<W: Write>(w: &mut W) -> fmt::Result {
    w.write_str("<button type=\"submit\">Save</button></form></body></html>")
}

/// The whole WiFi credential page of the captive portal.
///
/// # Errors
/// When the writer runs out of room.
pub fn write_credentials_page<W: Write>(w: &mut W, network_name: &str) -> fmt::Result {
    w.write_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">")?;
    w.write_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\"><title>")?;
    write_escaped(w, network_name)?;
    w.write_str("</title></head><body><h2>WiFi</h2><form method=\"post\" action=\"/wifi\">")?;
    w.write_str("<label for=\"ssid\">SSID</label><input id=\"ssid\" name=\"ssid\" maxlength=\"32\">")?;
    w.write_str("<label for=\"password\">Password</label>")?;
    w.write_str("<input id=\"password\" name=\"password\" type=\"password\" maxlength=\"64\">")?;
    w.write_str("<button type=\"submit\">Connect</button></form></body></html>")
}
