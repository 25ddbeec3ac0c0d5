//! # Display task
//! This module contains the task that draws the radio's text screens on the 128x32 OLED.
//!
//! The control loop writes into a [`TextGrid`] through [`OledText`]. A flush hands a copy of the
//! grid to the display task, which owns the I2C bus and redraws the panel. A slow flush never
//! holds up the control loop; only the newest grid is drawn.
use defmt::{Debug2Format, error, info, warn};
use embassy_rp::i2c::{Config, I2c};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embedded_graphics::{
    mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_5X8},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use radio_core::display::{COLUMNS, ROWS, TextDisplay, TextGrid};
use ssd1306_async::{I2CDisplayInterface, Ssd1306, prelude::*};

use crate::task::resources::{DisplayResources, Irqs};

/// Signal for handing a finished grid to the display task
static DISPLAY_SIGNAL: Signal<CriticalSectionRawMutex, TextGrid> = Signal::new();

/// Width of one character cell in pixels, glyph plus spacing.
const CELL_WIDTH: i32 = 6;
/// Height of one text row in pixels.
const CELL_HEIGHT: i32 = 8;

/// The text display the control loop draws on.
pub struct OledText {
    /// Characters as they will appear on the panel
    grid: TextGrid,
}

impl OledText {
    /// A blank display.
    pub const fn new() -> Self {
        Self { grid: TextGrid::new() }
    }
}

impl TextDisplay for OledText {
    fn clear(&mut self) {
        self.grid.clear();
    }

    fn print(&mut self, text: &str) {
        self.grid.print(text);
    }

    fn set_cursor(&mut self, column: u8, row: u8) {
        self.grid.set_cursor(column, row);
    }

    fn set_invert(&mut self, invert: bool) {
        self.grid.set_invert(invert);
    }

    async fn flush(&mut self) {
        if self.grid.take_dirty() {
            DISPLAY_SIGNAL.signal(self.grid.clone());
        }
    }
}

/// Top left corner of a character cell.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn cell_origin(row: usize, column: usize) -> Point {
    // both fit easily, the grid is 21x4
    Point::new(column as i32 * CELL_WIDTH, row as i32 * CELL_HEIGHT)
}

/// Draws every non-blank cell of `grid` into the frame buffer.
fn draw_grid<D>(display: &mut D, grid: &TextGrid, normal: MonoTextStyle<'_, BinaryColor>, inverted: MonoTextStyle<'_, BinaryColor>)
where
    D: DrawTarget<Color = BinaryColor>,
{
    for row in 0..ROWS {
        for (column, cell) in grid.row(row).iter().enumerate().take(COLUMNS) {
            if cell.ch == b' ' && !cell.inverted {
                continue;
            }
            let mut utf8 = [0u8; 4];
            let text = char::from(cell.ch).encode_utf8(&mut utf8);
            let style = if cell.inverted { inverted } else { normal };
            let _ = Text::with_baseline(text, cell_origin(row, column), style, Baseline::Top).draw(display);
        }
    }
}

/// Owns the panel and redraws it whenever a new grid arrives.
#[embassy_executor::task]
pub async fn display_task(r: DisplayResources) {
    info!("display task started");

    let mut config = Config::default();
    config.frequency = 400_000;
    let i2c = I2c::new_async(r.i2c0, r.scl, r.sda, Irqs, config);
    let interface = I2CDisplayInterface::new(i2c);
    let mut display =
        Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0).into_buffered_graphics_mode();
    if let Err(e) = display.init().await {
        error!("Display init failed: {:?}", Debug2Format(&e));
        return;
    }

    let normal = MonoTextStyleBuilder::new()
        .font(&FONT_5X8)
        .text_color(BinaryColor::On)
        .build();
    let inverted = MonoTextStyleBuilder::new()
        .font(&FONT_5X8)
        .text_color(BinaryColor::Off)
        .background_color(BinaryColor::On)
        .build();

    loop {
        let grid = DISPLAY_SIGNAL.wait().await;
        display.clear();
        draw_grid(&mut display, &grid, normal, inverted);
        if let Err(e) = display.flush().await {
            warn!("Display flush failed: {:?}", Debug2Format(&e));
        }
    }
}
