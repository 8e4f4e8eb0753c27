//! Full-block repaint with wrap-aware erase.
//!
//! The display is always rewritten as one block of rows. Before each rewrite
//! the previous block is erased by moving the cursor up over every physical
//! line it occupied, so the count has to follow the terminal's own wrapping
//! of the visible (escape-stripped) text.

use std::io::{self, Write};

use crate::ansi;

/// Move the cursor to column 1.
pub const CURSOR_TO_COLUMN_1: &str = "\x1b[1G";
/// Clear from the cursor to the end of the screen.
pub const CLEAR_TO_END_OF_SCREEN: &str = "\x1b[0J";
/// Blue, used for the label bracket.
pub const LABEL_COLOR: &str = "\x1b[0;34m";
/// Reset all attributes.
pub const RESET: &str = "\x1b[0m";

/// Escape sequence moving the cursor up `lines` rows.
pub fn cursor_up(lines: usize) -> String {
    format!("\x1b[{}A", lines)
}

/// Full erase sequence for a block of `lines` physical lines.
pub fn erase_sequence(lines: usize) -> String {
    format!(
        "{}{}{}",
        CURSOR_TO_COLUMN_1,
        cursor_up(lines),
        CLEAR_TO_END_OF_SCREEN
    )
}

/// Prefix `text` with a blue `[label]` tag.
pub fn with_label(label: Option<&str>, text: &str) -> String {
    match label {
        Some(label) => format!("{}[{}]{} {}", LABEL_COLOR, label, RESET, text),
        None => text.to_string(),
    }
}

/// Physical terminal lines taken by `text` at the given width.
///
/// Each `\n`-separated segment takes `ceil(visible / width)` lines, and at
/// least one even when empty. A width of 0 counts one line per segment.
pub fn physical_lines(text: &str, width: usize) -> usize {
    ansi::strip(text)
        .split('\n')
        .map(|segment| {
            let len = segment.chars().count();
            if width == 0 || len == 0 {
                1
            } else {
                len.div_ceil(width)
            }
        })
        .sum()
}

/// Repaint state: current row contents and the size of the last block.
#[derive(Debug, Clone)]
pub struct Repaint {
    rows: Vec<String>,
    width: usize,
    previous_lines: usize,
}

impl Repaint {
    /// State for `rows` empty rows at terminal `width`.
    pub fn new(rows: usize, width: usize) -> Self {
        Self {
            rows: vec![String::new(); rows],
            width,
            previous_lines: 0,
        }
    }

    /// Replace a row's content without touching the terminal.
    ///
    /// Returns false if `row` is out of range.
    pub fn set_row(&mut self, row: usize, text: String) -> bool {
        match self.rows.get_mut(row) {
            Some(slot) => {
                *slot = text;
                true
            }
            None => false,
        }
    }

    /// Replace a row's content and repaint the whole block to `out`.
    pub fn update<W: Write + ?Sized>(&mut self, row: usize, text: String, out: &mut W) -> io::Result<()> {
        if !self.set_row(row, text) {
            return Ok(());
        }
        self.repaint(out)
    }

    /// Erase the previous block, then write every row and flush.
    ///
    /// The frame is assembled first and written with a single call.
    pub fn repaint<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<()> {
        let mut frame = String::new();
        if self.previous_lines > 0 {
            frame.push_str(&erase_sequence(self.previous_lines));
        }

        let mut lines = 0;
        for row in &self.rows {
            frame.push_str(row);
            frame.push('\n');
            lines += physical_lines(row, self.width);
        }

        out.write_all(frame.as_bytes())?;
        out.flush()?;
        self.previous_lines = lines;
        Ok(())
    }

    /// Current row contents, in display order.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Physical lines written by the last repaint.
    pub fn previous_lines(&self) -> usize {
        self.previous_lines
    }

    /// Terminal width used for wrap accounting.
    pub fn width(&self) -> usize {
        self.width
    }
}
