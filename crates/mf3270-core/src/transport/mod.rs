//! Line transports between a session and an emulator process.
//!
//! - [`PipeTransport`]: the emulator's stdin/stdout
//! - [`SocketTransport`]: TCP to the emulator's script port on 127.0.0.1

#[cfg(test)]
pub(crate) mod mock;
pub mod pipe;
pub mod socket;

pub use pipe::PipeTransport;
pub use socket::{RetryPolicy, SocketTransport};

use tracing::info;

use crate::config::{EmulatorConfig, TransportKind};
use crate::error::Result;

/// Byte-line I/O with an emulator.
pub trait Transport: Send {
    /// Write raw bytes and flush.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read one line including its terminator. Returns an empty buffer once
    /// the peer has closed its end.
    fn read_line(&mut self) -> Result<Vec<u8>>;

    /// Attach to `target` (`host:port` or `lu@host:port`).
    ///
    /// Returns `true` when the transport made the host connection itself.
    /// `false` means the caller has to send a `Connect` command.
    fn connect(&mut self, target: &str) -> Result<bool>;

    /// Release the pipe or socket.
    fn close(&mut self) -> Result<()>;
}

/// Create the transport `config` asks for.
///
/// Pipe transports start the emulator immediately. Socket transports start
/// it on [`Transport::connect`], because the host goes on its command line.
pub fn open(config: &EmulatorConfig) -> Result<Box<dyn Transport>> {
    let args = config.launch_args()?;
    info!(
        "Opening {:?} transport for {} {:?}",
        config.transport, config.executable, args
    );
    Ok(match config.transport {
        TransportKind::Pipe => Box::new(PipeTransport::spawn(&config.executable, &args)?),
        TransportKind::Socket => Box::new(SocketTransport::new(
            &config.executable,
            args,
            config.script_port,
        )),
    })
}
