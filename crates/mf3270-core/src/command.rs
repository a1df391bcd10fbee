//! One request/reply round trip.
//!
//! A reply is zero or more `data: ` lines, then the status line, then the
//! outcome line:
//!
//! ```text
//! -> ascii(0,0,10)
//! <- data: LOGON ===>
//! <- U F U C(host) I 2 24 80 0 10 0x0 0.001
//! <- ok
//! ```
//!
//! The protocol has no request ids, so a reply must be read completely before
//! the next command is written.

use serde::Serialize;
use tracing::debug;

use crate::action::{Action, QUIT};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::transport::Transport;

const DATA_PREFIX: &[u8] = b"data: ";

/// Message used when an `error` outcome arrives without data lines.
pub const NO_ERROR_MESSAGE: &str = "[no error message]";

/// How the emulator judged a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// `ok`
    Ok,
    /// Empty outcome line, accepted only for `Quit`.
    Quit,
    /// `error`, with the message assembled from the data lines.
    Failed { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }
}

/// A command ready to be sent. Executing it consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    raw: String,
}

impl Command {
    /// Build a command. Text containing a line break is rejected, since it
    /// would be read as two commands.
    pub fn new(action: impl Into<Action>) -> Result<Self> {
        let raw = action.into().to_string();
        if raw.contains(&['\n', '\r'][..]) {
            return Err(Error::InvalidInput(format!(
                "command must not contain line breaks: {:?}",
                raw
            )));
        }
        Ok(Self { raw })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_quit(&self) -> bool {
        self.raw == QUIT
    }

    /// Write the command and read its full reply.
    ///
    /// Transport and framing problems are errors. An `error` outcome is not:
    /// it comes back as [`Outcome::Failed`] so the caller can decide.
    pub fn execute(self, transport: &mut dyn Transport) -> Result<Reply> {
        debug!("Sending command: {}", self.raw);

        let mut line = Vec::with_capacity(self.raw.len() + 1);
        line.extend_from_slice(self.raw.as_bytes());
        line.push(b'\n');
        transport.write(&line)?;

        let mut data = Vec::new();
        let status_line = loop {
            let line = transport.read_line()?;
            match line.strip_prefix(DATA_PREFIX) {
                Some(payload) => data.push(trim_line_end(payload).to_vec()),
                None => break trim_end(&line).to_vec(),
            }
        };
        let outcome_line = transport.read_line()?;
        let outcome_text = String::from_utf8_lossy(trim_end(&outcome_line)).into_owned();

        let outcome = self.classify(&outcome_text, &data)?;
        debug!("Command {} finished: {:?}", self.raw, outcome);

        Ok(Reply {
            command: self.raw,
            data,
            status: Status::parse(Some(&status_line)),
            outcome,
        })
    }

    fn classify(&self, outcome: &str, data: &[Vec<u8>]) -> Result<Outcome> {
        match outcome {
            "ok" => Ok(Outcome::Ok),
            "" if self.is_quit() => Ok(Outcome::Quit),
            "error" => {
                let message = if data.is_empty() {
                    NO_ERROR_MESSAGE.to_string()
                } else {
                    let joined = data.concat();
                    String::from_utf8_lossy(trim_end(&joined)).into_owned()
                };
                Ok(Outcome::Failed { message })
            }
            other => Err(Error::UnexpectedOutcome(other.to_string())),
        }
    }
}

/// Everything the emulator sent back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub command: String,
    /// Payloads of the `data: ` lines, in arrival order.
    pub data: Vec<Vec<u8>>,
    pub status: Status,
    pub outcome: Outcome,
}

impl Reply {
    /// Turn an [`Outcome::Failed`] into [`Error::CommandFailed`].
    pub fn into_result(self) -> Result<Self> {
        match self.outcome {
            Outcome::Failed { message } => Err(Error::CommandFailed {
                command: self.command,
                message,
            }),
            _ => Ok(self),
        }
    }

    /// Data lines decoded as UTF-8 (lossy).
    pub fn data_text(&self) -> Vec<String> {
        self.data
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |pos| pos + 1);
    &line[..end]
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::ScriptedTransport;

    #[test]
    fn test_ok_without_data() {
        let (mut transport, journal) = ScriptedTransport::new();
        transport.reply(&[], "U F U C(host:23) I 2 24 80 0 0 0x0 -", "ok");

        let reply = Command::new("Enter")
            .unwrap()
            .execute(&mut transport)
            .unwrap();

        assert_eq!(reply.outcome, Outcome::Ok);
        assert!(reply.data.is_empty());
        assert!(reply.status.is_connected());
        assert_eq!(journal.lock().unwrap().writes, vec!["Enter\n"]);
    }

    #[test]
    fn test_data_lines_collected_in_order() {
        let (mut transport, _) = ScriptedTransport::new();
        transport.push_line(b"data: first line\r\n");
        transport.push_line(b"data: second  \n");
        transport.push_line(b"data: \n");
        transport.push_line(b"U F U N I 2 24 80 0 0 0x0 -\n");
        transport.push_line(b"ok\n");

        let reply = Command::new("Ascii").unwrap().execute(&mut transport).unwrap();

        assert_eq!(
            reply.data,
            vec![b"first line".to_vec(), b"second  ".to_vec(), Vec::new()]
        );
        assert_eq!(reply.data_text()[0], "first line");
        assert_eq!(reply.status.connection_state.as_deref(), Some("N"));
    }

    #[test]
    fn test_error_without_data_uses_placeholder() {
        let (mut transport, _) = ScriptedTransport::new();
        transport.reply(&[], "L F U N I 2 24 80 0 0 0x0 -", "error");

        let reply = Command::new("Enter").unwrap().execute(&mut transport).unwrap();
        assert_eq!(
            reply.outcome,
            Outcome::Failed {
                message: NO_ERROR_MESSAGE.to_string()
            }
        );
        // Status is kept even though the command failed.
        assert_eq!(reply.status.keyboard.as_deref(), Some("L"));
    }

    #[test]
    fn test_error_concatenates_data() {
        let (mut transport, _) = ScriptedTransport::new();
        transport.reply(
            &["Keyboard locked, ", "try again   "],
            "L F U N I 2 24 80 0 0 0x0 -",
            "error",
        );

        let reply = Command::new("String(\"x\")")
            .unwrap()
            .execute(&mut transport)
            .unwrap();
        let err = reply.into_result().unwrap_err();
        match err {
            Error::CommandFailed { command, message } => {
                assert_eq!(command, "String(\"x\")");
                assert_eq!(message, "Keyboard locked, try again");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_outcome_accepted_for_quit() {
        let (mut transport, _) = ScriptedTransport::new();
        // Emulator exits: both lines read as EOF.
        let reply = Command::new(Action::Quit)
            .unwrap()
            .execute(&mut transport)
            .unwrap();
        assert_eq!(reply.outcome, Outcome::Quit);
        assert_eq!(reply.status, Status::default());
    }

    #[test]
    fn test_empty_outcome_rejected_for_other_commands() {
        let (mut transport, _) = ScriptedTransport::new();
        transport.reply(&[], "U F U N I 2 24 80 0 0 0x0 -", "");

        let err = Command::new("Enter")
            .unwrap()
            .execute(&mut transport)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedOutcome(ref s) if s.is_empty()));
    }

    #[test]
    fn test_unknown_outcome_is_protocol_violation() {
        let (mut transport, _) = ScriptedTransport::new();
        transport.reply(&[], "U F U N I 2 24 80 0 0 0x0 -", "maybe");

        let err = Command::new("Enter")
            .unwrap()
            .execute(&mut transport)
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedOutcome(ref s) if s == "maybe"));
    }

    #[test]
    fn test_embedded_newline_rejected() {
        let err = Command::new("Enter\nQuit").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(Command::new("String(\"a\rb\")").is_err());
    }

    #[test]
    fn test_quit_detection_is_exact() {
        assert!(Command::new("Quit").unwrap().is_quit());
        assert!(!Command::new("quit").unwrap().is_quit());
        assert!(!Command::new("Quit()").unwrap().is_quit());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Failed {
            message: "bad".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"result":"failed","message":"bad"}"#);
        assert_eq!(
            serde_json::to_string(&Outcome::Ok).unwrap(),
            r#"{"result":"ok"}"#
        );
    }
}
