//! Typed scripting actions and their exact wire text.
//!
//! Coordinates inside an [`Action`] are already 0-based, as the protocol
//! expects. Conversion from the 1-based positions shown in the terminal's
//! status area happens in [`crate::session`].

use std::fmt;
use std::path::PathBuf;

use crate::text::quote;

/// Wire text of the quit action; the only command whose outcome line is empty.
pub const QUIT: &str = "Quit";

/// A single scripting action understood by the x3270 family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `Connect(target)`, only sent over pipe transports.
    Connect(String),
    Disconnect,
    Quit,
    /// No-op that only refreshes the status line.
    Ignore,
    /// `Wait(secs, InputField)`.
    WaitInputField { timeout_secs: u64 },
    MoveCursor { row: u16, col: u16 },
    /// `ascii(row,col,len)`: one line of screen text.
    Ascii { row: u16, col: u16, length: usize },
    /// `Ascii`: the whole screen, one data line per row.
    AsciiScreen,
    /// `String("...")`, text is quoted on render.
    String(String),
    DeleteField,
    Delete,
    Enter,
    Tab,
    BackTab,
    Clear,
    Pf(u8),
    Pa(u8),
    /// `PrintText(html,file,path)`.
    PrintHtml(PathBuf),
    /// Caller-supplied command text, sent verbatim.
    Raw(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Connect(target) => write!(f, "Connect({})", target),
            Action::Disconnect => f.write_str("Disconnect"),
            Action::Quit => f.write_str(QUIT),
            Action::Ignore => f.write_str("ignore"),
            Action::WaitInputField { timeout_secs } => {
                write!(f, "Wait({}, InputField)", timeout_secs)
            }
            Action::MoveCursor { row, col } => write!(f, "MoveCursor({}, {})", row, col),
            Action::Ascii { row, col, length } => write!(f, "ascii({},{},{})", row, col, length),
            Action::AsciiScreen => f.write_str("Ascii"),
            Action::String(text) => write!(f, "String(\"{}\")", quote(text)),
            Action::DeleteField => f.write_str("DeleteField"),
            Action::Delete => f.write_str("Delete"),
            Action::Enter => f.write_str("Enter"),
            Action::Tab => f.write_str("Tab"),
            Action::BackTab => f.write_str("BackTab"),
            Action::Clear => f.write_str("Clear"),
            Action::Pf(n) => write!(f, "PF({})", n),
            Action::Pa(n) => write!(f, "PA({})", n),
            Action::PrintHtml(path) => write!(f, "PrintText(html,file,{})", path.display()),
            Action::Raw(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Action {
    fn from(text: &str) -> Self {
        Action::Raw(text.to_string())
    }
}

impl From<String> for Action {
    fn from(text: String) -> Self {
        Action::Raw(text)
    }
}
