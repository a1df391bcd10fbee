//! Emulator session: lifecycle plus cursor, field, and region primitives.
//!
//! A session moves through `Unconnected -> Connected -> Terminated`.
//! Terminated is final; every later call fails with [`Error::Terminated`]
//! without touching the transport.
//!
//! All coordinates taken by this API are 1-based, as shown in the terminal's
//! status area. They are converted to the protocol's 0-based form here.

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::command::{Command, Reply};
use crate::config::{ConnectTarget, EmulatorConfig};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::text::unescape;
use crate::transport::{self, Transport};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    Terminated,
}

/// One emulator instance and the state learned from it.
///
/// Dropping a live session sends `Quit` and closes the transport.
pub struct Session {
    config: EmulatorConfig,
    transport: Option<Box<dyn Transport>>,
    status: Status,
    state: SessionState,
    last_target: Option<ConnectTarget>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("executable", &self.config.executable)
            .field("state", &self.state)
            .field("status", &self.status.as_string)
            .field("last_target", &self.last_target)
            .finish()
    }
}

impl Session {
    /// Create a session. Nothing is launched until [`Session::connect`].
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            transport: None,
            status: Status::default(),
            state: SessionState::Unconnected,
            last_target: None,
        }
    }

    /// Create a session over an already-open transport.
    pub fn with_transport(config: EmulatorConfig, transport: Box<dyn Transport>) -> Self {
        let mut session = Self::new(config);
        session.transport = Some(transport);
        session
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Status line from the most recent command.
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub fn last_target(&self) -> Option<&ConnectTarget> {
        self.last_target.as_ref()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_terminated() {
            return Err(Error::Terminated);
        }
        Ok(())
    }

    /// Run a prepared command and record its status, whatever the outcome.
    fn run(&mut self, command: Command) -> Result<Reply> {
        self.ensure_live()?;
        let transport = self.transport.as_deref_mut().ok_or(Error::NotConnected)?;
        let reply = command.execute(transport)?;
        self.status = reply.status.clone();
        Ok(reply)
    }

    /// Execute one command and return its reply, failed outcome included.
    pub fn exec_command(&mut self, action: impl Into<Action>) -> Result<Reply> {
        self.ensure_live()?;
        self.run(Command::new(action)?)
    }

    /// Execute one command, turning an `error` outcome into
    /// [`Error::CommandFailed`].
    pub fn exec(&mut self, action: impl Into<Action>) -> Result<Reply> {
        self.exec_command(action)?.into_result()
    }

    /// Connect to a host, launching the emulator if needed.
    pub fn connect(&mut self, target: &ConnectTarget) -> Result<()> {
        self.ensure_live()?;
        let rendered = target.to_string();

        if self.transport.is_none() {
            self.transport = Some(transport::open(&self.config)?);
        }
        let transport = self.transport.as_deref_mut().ok_or(Error::NotConnected)?;
        if !transport.connect(&rendered)? {
            self.exec(Action::Connect(rendered.clone()))?;
        }

        info!("Connected to {}", rendered);
        self.last_target = Some(target.clone());
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Disconnect and connect again to the last host.
    pub fn reconnect(&mut self) -> Result<()> {
        self.ensure_live()?;
        let target = self.last_target.clone().ok_or(Error::NoPreviousHost)?;
        self.exec(Action::Disconnect)?;
        self.connect(&target)
    }

    /// Quit the emulator and release the transport.
    ///
    /// A broken pipe or reset connection while quitting means the emulator is
    /// already gone and is ignored. The transport is closed and the session
    /// marked terminated even when quitting fails.
    pub fn terminate(&mut self) -> Result<()> {
        if self.is_terminated() {
            return Ok(());
        }
        debug!("Terminating emulator session");

        let quit = if self.transport.is_some() {
            self.exec(Action::Quit).map(drop)
        } else {
            Ok(())
        };
        let quit = match quit {
            Err(e) if e.is_peer_gone() => {
                debug!("Emulator already gone while quitting: {}", e);
                Ok(())
            }
            other => other,
        };

        let closed = match self.transport.take() {
            Some(mut transport) => transport.close(),
            None => Ok(()),
        };
        self.state = SessionState::Terminated;
        quit.and(closed)
    }

    /// Refresh the status with a no-op and report whether a host is attached.
    pub fn is_connected(&mut self) -> Result<bool> {
        match self.exec_command(Action::Ignore) {
            Ok(_) => Ok(self.status.is_connected()),
            Err(Error::NotConnected) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Wait until the cursor sits on an input field and the keyboard is
    /// unlocked, using the configured timeout.
    pub fn wait_for_field(&mut self) -> Result<()> {
        self.wait_for_field_within(self.config.wait_timeout)
    }

    /// Like [`Session::wait_for_field`] with an explicit timeout.
    ///
    /// Hosts can unlock the keyboard before the screen is ready, so the
    /// keyboard state is checked again once the wait returns. The protocol
    /// takes whole seconds; partial seconds round up.
    pub fn wait_for_field_within(&mut self, timeout: Duration) -> Result<()> {
        let timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self.exec(Action::WaitInputField { timeout_secs })?;
        if !self.status.keyboard_unlocked() {
            return Err(Error::KeyboardLocked {
                state: self.status.keyboard.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Move the cursor to a 1-based position.
    pub fn move_cursor(&mut self, row: u16, col: u16) -> Result<()> {
        let (row, col) = zero_based(row, col)?;
        self.exec(Action::MoveCursor { row, col })?;
        Ok(())
    }

    /// Read `length` characters starting at a 1-based position.
    pub fn read_region(&mut self, row: u16, col: u16, length: usize) -> Result<String> {
        let (row, col) = zero_based(row, col)?;
        let reply = self.exec(Action::Ascii { row, col, length })?;
        match reply.data.as_slice() {
            [line] => Ok(unescape(line)),
            lines => Err(Error::DataLineCount(lines.len())),
        }
    }

    /// Type text at the cursor, or at `at` after moving there.
    pub fn send_text(&mut self, text: &str, at: Option<(u16, u16)>) -> Result<()> {
        let command = Command::new(Action::String(text.to_string()))?;
        if let Some((row, col)) = at {
            self.move_cursor(row, col)?;
        }
        self.run(command)?.into_result()?;
        pause(self.config.post_write_wait);
        Ok(())
    }

    /// Type text, optionally at a 1-based position, then press Enter.
    ///
    /// A position is bounds-checked against the screen before anything is
    /// sent.
    pub fn send_text_and_enter(&mut self, text: &str, at: Option<(u16, u16)>) -> Result<()> {
        if let Some((row, col)) = at {
            self.check_limits(row, col, text.chars().count())?;
        }
        self.send_text(text, at)?;
        self.send_enter()
    }

    /// Clear the field under the cursor and move to its start.
    pub fn delete_field(&mut self) -> Result<()> {
        self.exec(Action::DeleteField)?;
        Ok(())
    }

    /// Like [`Session::delete_field`], moving to `at` first if given.
    pub fn delete_field_at(&mut self, at: Option<(u16, u16)>) -> Result<()> {
        if let Some((row, col)) = at {
            self.move_cursor(row, col)?;
        }
        self.delete_field()
    }

    /// Delete the character under the cursor, moving to `at` first if given.
    pub fn delete_char(&mut self, at: Option<(u16, u16)>) -> Result<()> {
        if let Some((row, col)) = at {
            self.move_cursor(row, col)?;
        }
        self.exec(Action::Delete)?;
        Ok(())
    }

    /// Replace the contents of the field at a 1-based position.
    ///
    /// Fails with [`Error::FieldTruncated`] before any I/O if `text` is
    /// longer than `length` characters.
    pub fn fill_field(&mut self, row: u16, col: u16, text: &str, length: usize) -> Result<()> {
        if text.chars().count() > length {
            return Err(Error::FieldTruncated {
                length,
                text: text.to_string(),
            });
        }
        self.move_cursor(row, col)?;
        self.delete_field()?;
        self.send_text(text, None)
    }

    /// Dump the screen as HTML to `path`, written by the emulator itself.
    pub fn save_screen(&mut self, path: &Path) -> Result<()> {
        self.exec(Action::PrintHtml(path.to_path_buf()))?;
        Ok(())
    }

    pub fn send_enter(&mut self) -> Result<()> {
        self.exec(Action::Enter)?;
        pause(self.config.post_command_wait);
        Ok(())
    }

    /// Press a program function key, `PF(1)` through `PF(24)`.
    pub fn send_pf(&mut self, key: u8) -> Result<()> {
        if !(1..=24).contains(&key) {
            return Err(Error::InvalidInput(format!("PF key must be 1-24, got {}", key)));
        }
        self.exec(Action::Pf(key))?;
        pause(self.config.post_command_wait);
        Ok(())
    }

    /// Press a program attention key, `PA(1)` through `PA(3)`.
    pub fn send_pa(&mut self, key: u8) -> Result<()> {
        if !(1..=3).contains(&key) {
            return Err(Error::InvalidInput(format!("PA key must be 1-3, got {}", key)));
        }
        self.exec(Action::Pa(key))?;
        pause(self.config.post_command_wait);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.exec(Action::Clear)?;
        Ok(())
    }

    pub fn move_next_field(&mut self) -> Result<()> {
        self.exec(Action::Tab)?;
        Ok(())
    }

    pub fn move_previous_field(&mut self) -> Result<()> {
        self.exec(Action::BackTab)?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_terminated() || self.transport.is_none() {
            return;
        }
        if let Err(e) = self.terminate() {
            warn!("Failed to terminate emulator session on drop: {}", e);
        }
    }
}

fn pause(wait: Duration) {
    if !wait.is_zero() {
        debug!("Pausing {:?}", wait);
        thread::sleep(wait);
    }
}

fn zero_based(row: u16, col: u16) -> Result<(u16, u16)> {
    match (row.checked_sub(1), col.checked_sub(1)) {
        (Some(row), Some(col)) => Ok((row, col)),
        _ => Err(Error::InvalidInput(format!(
            "coordinates are 1-based, got ({}, {})",
            row, col
        ))),
    }
}
