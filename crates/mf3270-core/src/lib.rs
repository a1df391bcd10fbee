//! Drive x3270-family terminal emulators through their scripting protocol.
//!
//! The emulator (`s3270`, `x3270`, `ws3270`, `wc3270`) does all 3270 work;
//! this crate sends it one action per line and parses what comes back.
//!
//! # Modules
//!
//! - [`transport`]: pipe and TCP script-port transports
//! - [`status`]: the twelve-field status line
//! - [`command`]: one request/reply cycle and its [`command::Outcome`]
//! - [`session`]: connect/terminate lifecycle and cursor, field, region operations
//! - [`screen`]: whole-screen reads, searches and waits
//! - [`action`]: typed actions and their wire text
//! - [`config`]: executable presets, launch arguments, connect targets
//! - [`error`]: error types
//!
//! # Example
//!
//! ```no_run
//! use mf3270_core::{ConnectTarget, EmulatorConfig, Session};
//!
//! # fn main() -> mf3270_core::Result<()> {
//! let mut session = Session::new(EmulatorConfig::s3270());
//! session.connect(&ConnectTarget::new("mainframe.example.com"))?;
//! session.wait_for_field()?;
//! session.fill_field(10, 20, "USER01", 8)?;
//! session.send_enter()?;
//! println!("{}", session.read_region(1, 1, 80)?);
//! session.terminate()?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod command;
pub mod config;
pub mod error;
pub mod screen;
pub mod session;
pub mod status;
pub mod text;
pub mod transport;

pub use action::Action;
pub use command::{Command, Outcome, Reply};
pub use config::{ConnectTarget, EmulatorConfig, ExtraArgs, Platform, TransportKind};
pub use error::{ApiError, Error, ErrorKind, Result};
pub use session::{Session, SessionState};
pub use status::Status;
pub use transport::Transport;
