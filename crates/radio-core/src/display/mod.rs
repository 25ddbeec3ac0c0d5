//! # Display
//! The character display as a dumb terminal, plus an in-memory text grid that implements it.
//!
//! The grid is what the firmware renders to the OLED, and what the tests inspect.
pub mod screens;

use heapless::String;

/// Characters per line, 5x7 font on a 128 pixel wide panel.
pub const COLUMNS: usize = 21;
/// Lines on a 32 pixel high panel.
pub const ROWS: usize = 4;

/// A small fixed-size text surface.
pub trait TextDisplay {
    /// Blanks the surface and homes the cursor.
    fn clear(&mut self);

    /// Writes text at the cursor. `\n` starts a new line.
    fn print(&mut self, text: &str);

    /// Writes text followed by a line break.
    fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }

    /// Moves the cursor.
    fn set_cursor(&mut self, column: u8, row: u8);

    /// Draws following text inverted.
    fn set_invert(&mut self, invert: bool);

    /// Pushes pending changes to the panel.
    async fn flush(&mut self);
}

/// One character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Printable ASCII character.
    pub ch: u8,
    /// Drawn inverted.
    pub inverted: bool,
}

impl Cell {
    /// An empty, non-inverted cell.
    const BLANK: Self = Self {
        ch: b' ',
        inverted: false,
    };
}

/// Text grid with a cursor. Text past the right or bottom edge is clipped.
#[derive(Debug, Clone)]
pub struct TextGrid {
    /// Cells, row major.
    cells: [[Cell; COLUMNS]; ROWS],
    /// Cursor column.
    column: usize,
    /// Cursor row.
    row: usize,
    /// Invert mode for following text.
    invert: bool,
    /// Changed since the last [`TextGrid::take_dirty`].
    dirty: bool,
}

impl Default for TextGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGrid {
    /// A blank grid.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [[Cell::BLANK; COLUMNS]; ROWS],
            column: 0,
            row: 0,
            invert: false,
            dirty: true,
        }
    }

    /// The cells of one row.
    #[must_use]
    pub const fn row(&self, row: usize) -> &[Cell; COLUMNS] {
        &self.cells[row]
    }

    /// The text of one row without trailing blanks.
    #[must_use]
    pub fn line(&self, row: usize) -> String<COLUMNS> {
        let mut line = String::new();
        for cell in &self.cells[row] {
            let _ = line.push(char::from(cell.ch));
        }
        let trimmed = line.trim_end().len();
        line.truncate(trimmed);
        line
    }

    /// Whether the whole grid is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().flatten().all(|cell| *cell == Cell::BLANK)
    }

    /// Whether anything changed since the last call, clearing the flag.
    pub const fn take_dirty(&mut self) -> bool {
        let dirty = self.dirty;
        self.dirty = false;
        dirty
    }

    /// Writes one character at the cursor.
    fn put(&mut self, ch: char) {
        if ch == '\n' {
            self.column = 0;
            self.row += 1;
            return;
        }
        if self.row < ROWS && self.column < COLUMNS {
            let printable = if ch.is_ascii_graphic() || ch == ' ' {
                ch as u8
            } else {
                b'?'
            };
            self.cells[self.row][self.column] = Cell {
                ch: printable,
                inverted: self.invert,
            };
            self.dirty = true;
        }
        self.column += 1;
    }
}

impl TextDisplay for TextGrid {
    fn clear(&mut self) {
        self.cells = [[Cell::BLANK; COLUMNS]; ROWS];
        self.column = 0;
        self.row = 0;
        self.dirty = true;
    }

    fn print(&mut self, text: &str) {
        for ch in text.chars() {
            self.put(ch);
        }
    }

    fn set_cursor(&mut self, column: u8, row: u8) {
        self.column = usize::from(column);
        self.row = usize::from(row);
    }

    fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    async fn flush(&mut self) {}
}
