//! Error types for emulator sessions.
//!
//! [`Error`] is what every fallible operation in this crate returns. It is
//! classified into a coarse [`ErrorKind`] so callers can decide what is
//! recoverable, and can be turned into an [`ApiError`] carrying a suggestion
//! for machine consumers (the CLI prints these as JSON).

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while driving an emulator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The emulator executable could not be started.
    #[error("failed to launch '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the pipe or socket failed.
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// The transport has no open stream yet.
    #[error("transport is not connected")]
    NotConnected,

    /// The script port never accepted a connection.
    #[error("script port 127.0.0.1:{port} refused {attempts} connection attempts")]
    ConnectExhausted { port: u16, attempts: u32 },

    /// The outcome line was neither `ok` nor `error`.
    #[error("expected \"ok\" or \"error\" result, but received: {0:?}")]
    UnexpectedOutcome(String),

    /// A single-line read produced the wrong number of data lines.
    #[error("expected exactly one data line, but received {0}")]
    DataLineCount(usize),

    /// The emulator answered `error`.
    #[error("command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    /// The session was terminated and can no longer be used.
    #[error("this emulator session has been terminated")]
    Terminated,

    /// `Wait(InputField)` returned but the keyboard is still locked.
    #[error("keyboard not unlocked, state was: {state}")]
    KeyboardLocked { state: String },

    /// Text does not fit into the target field.
    #[error("length limit {length}, but got \"{text}\"")]
    FieldTruncated { length: usize, text: String },

    /// Caller-supplied input that cannot be expressed in the protocol.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `reconnect` was called before any `connect`.
    #[error("no previous host to reconnect to")]
    NoPreviousHost,

    /// Coordinates fall outside the emulated screen.
    #[error("position ({row}, {col}) with length {length} exceeds the {rows}x{cols} screen")]
    OutOfBounds {
        row: u16,
        col: u16,
        length: usize,
        rows: u16,
        cols: u16,
    },

    /// A polled screen condition never became true.
    #[error("\"{what}\" not found within {timeout:?}")]
    WaitTimeout { what: String, timeout: Duration },

    /// The extra-arguments file could not be read.
    #[error("failed to read argument file {}: {source}", path.display())]
    ArgsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Process, pipe, or socket failure.
    Transport,
    /// The reply stream did not look like the protocol.
    ProtocolViolation,
    /// The emulator reported `error` for a well-formed command.
    CommandFailure,
    /// The session is terminated.
    SessionTerminated,
    /// The keyboard was locked after waiting for an input field.
    KeyboardState,
    /// Text longer than its field.
    FieldTruncation,
    /// Rejected before any I/O.
    InvalidInput,
    /// A wait loop gave up.
    Timeout,
}

impl Error {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Spawn { .. }
            | Error::Io { .. }
            | Error::NotConnected
            | Error::ConnectExhausted { .. }
            | Error::ArgsFile { .. } => ErrorKind::Transport,
            Error::UnexpectedOutcome(_) | Error::DataLineCount(_) => ErrorKind::ProtocolViolation,
            Error::CommandFailed { .. } => ErrorKind::CommandFailure,
            Error::Terminated => ErrorKind::SessionTerminated,
            Error::KeyboardLocked { .. } => ErrorKind::KeyboardState,
            Error::FieldTruncated { .. } => ErrorKind::FieldTruncation,
            Error::InvalidInput(_) | Error::NoPreviousHost | Error::OutOfBounds { .. } => {
                ErrorKind::InvalidInput
            }
            Error::WaitTimeout { .. } => ErrorKind::Timeout,
        }
    }

    /// True when the peer has already gone away: a broken pipe (the process
    /// exited) or a reset connection (the socket was closed first).
    pub fn is_peer_gone(&self) -> bool {
        match self {
            Error::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}

/// Error codes for machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TransportFailed,
    ProtocolViolation,
    CommandFailed,
    SessionTerminated,
    KeyboardLocked,
    FieldTruncated,
    InvalidInput,
    Timeout,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::TransportFailed => write!(f, "TRANSPORT_FAILED"),
            ErrorCode::ProtocolViolation => write!(f, "PROTOCOL_VIOLATION"),
            ErrorCode::CommandFailed => write!(f, "COMMAND_FAILED"),
            ErrorCode::SessionTerminated => write!(f, "SESSION_TERMINATED"),
            ErrorCode::KeyboardLocked => write!(f, "KEYBOARD_LOCKED"),
            ErrorCode::FieldTruncated => write!(f, "FIELD_TRUNCATED"),
            ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
            ErrorCode::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Transport => ErrorCode::TransportFailed,
            ErrorKind::ProtocolViolation => ErrorCode::ProtocolViolation,
            ErrorKind::CommandFailure => ErrorCode::CommandFailed,
            ErrorKind::SessionTerminated => ErrorCode::SessionTerminated,
            ErrorKind::KeyboardState => ErrorCode::KeyboardLocked,
            ErrorKind::FieldTruncation => ErrorCode::FieldTruncated,
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            ErrorKind::Timeout => ErrorCode::Timeout,
        }
    }
}

/// An error report with a hint on what to try next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        let suggestion = match err {
            Error::Spawn { executable, .. } => format!(
                "Verify '{}' is installed and on your PATH, or pass --executable",
                executable
            ),
            Error::ConnectExhausted { .. } => {
                "Check that nothing else is bound to the script port, or pick another with --script-port"
                    .to_string()
            }
            Error::ArgsFile { .. } => "Check the path given with --args-file or MF3270_ARGS_FILE".to_string(),
            Error::NotConnected => "Connect to a host before issuing commands".to_string(),
            Error::Io { .. } => {
                "The emulator process may have exited. Run with -v for details.".to_string()
            }
            Error::UnexpectedOutcome(_) | Error::DataLineCount(_) => {
                "The emulator reply stream is out of sync; start a new session".to_string()
            }
            Error::CommandFailed { .. } => {
                "Check the command syntax against the x3270 action reference".to_string()
            }
            Error::Terminated => "Open a new session; terminated sessions cannot be reused".to_string(),
            Error::KeyboardLocked { .. } => {
                "The host has not finished drawing the screen; wait and retry".to_string()
            }
            Error::FieldTruncated { .. } => "Shorten the text or pass a larger field length".to_string(),
            Error::NoPreviousHost => "Call connect before reconnect".to_string(),
            Error::OutOfBounds { .. } => {
                "Coordinates are 1-based and must fit within the screen reported by 'status'".to_string()
            }
            Error::InvalidInput(_) => "Check the command syntax and try again".to_string(),
            Error::WaitTimeout { .. } => "Increase the timeout or check the expected text".to_string(),
        };
        Self {
            code: err.kind().into(),
            message: err.to_string(),
            suggestion: Some(suggestion),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}
