//! The twelve-field status line emitted after every command.
//!
//! ```text
//! U F U C(host.example.com) I 2 24 80 0 0 0x0 0.002
//! │ │ │ │                   │ │ │  │  │ │ │   └ execution time
//! │ │ │ │                   │ │ │  │  │ │ └ window id
//! │ │ │ │                   │ │ │  │  │ └ cursor column (0-based)
//! │ │ │ │                   │ │ │  │  └ cursor row (0-based)
//! │ │ │ │                   │ │ │  └ screen columns
//! │ │ │ │                   │ │ └ screen rows
//! │ │ │ │                   │ └ model number
//! │ │ │ │                   └ emulator mode
//! │ │ │ └ connection state
//! │ │ └ field protection
//! │ └ screen formatting
//! └ keyboard state
//! ```
//!
//! Parsing is total: blank input and short lines simply leave fields absent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of fields in a status line.
pub const STATUS_FIELDS: usize = 12;

/// Snapshot of emulator state taken from one status line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The whole line, trailing whitespace removed.
    pub as_string: String,
    pub keyboard: Option<String>,
    pub screen_format: Option<String>,
    pub field_protection: Option<String>,
    pub connection_state: Option<String>,
    pub emulator_mode: Option<String>,
    pub model_number: Option<String>,
    pub row_number: Option<String>,
    pub col_number: Option<String>,
    pub cursor_row: Option<String>,
    pub cursor_col: Option<String>,
    pub window_id: Option<String>,
    pub exec_time: Option<String>,
}

impl Status {
    /// Parse a raw status line. `None` or an empty line yields a status with
    /// every field absent.
    pub fn parse(line: Option<&[u8]>) -> Self {
        let line = match line {
            Some(line) if !line.is_empty() => String::from_utf8_lossy(line),
            _ => return Self::default(),
        };

        let mut parts = line
            .split(' ')
            .map(|part| (!part.is_empty()).then(|| part.to_string()));
        let mut next = || parts.next().flatten();

        Self {
            as_string: line.trim_end().to_string(),
            keyboard: next(),
            screen_format: next(),
            field_protection: next(),
            connection_state: next(),
            emulator_mode: next(),
            model_number: next(),
            row_number: next(),
            col_number: next(),
            cursor_row: next(),
            cursor_col: next(),
            window_id: next(),
            exec_time: next(),
        }
    }

    /// Keyboard is `U` (unlocked).
    pub fn keyboard_unlocked(&self) -> bool {
        self.keyboard.as_deref() == Some("U")
    }

    /// Connection state looks like `C(host)`; disconnected is `N`.
    pub fn is_connected(&self) -> bool {
        self.connection_state
            .as_deref()
            .is_some_and(|state| state.starts_with("C("))
    }

    /// Screen dimensions as (rows, cols), when both fields are numeric.
    pub fn screen_size(&self) -> Option<(u16, u16)> {
        let rows = self.row_number.as_deref()?.parse().ok()?;
        let cols = self.col_number.as_deref()?.parse().ok()?;
        Some((rows, cols))
    }

    /// Cursor position as reported by the emulator (0-based).
    pub fn cursor(&self) -> Option<(u16, u16)> {
        let row = self.cursor_row.as_deref()?.parse().ok()?;
        let col = self.cursor_col.as_deref()?.parse().ok()?;
        Some((row, col))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STATUS: {}", self.as_string)
    }
}
