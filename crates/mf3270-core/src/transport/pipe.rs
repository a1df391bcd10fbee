//! Emulator driven through its standard streams.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::debug;

use super::Transport;
use crate::error::{Error, Result};

/// A child emulator process started in script mode.
pub struct PipeTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl PipeTransport {
    /// Start `executable` with `args`, stdin and stdout piped.
    pub fn spawn(executable: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Spawn {
                executable: executable.to_string(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            // Both were requested as piped above.
            let _ = child.kill();
            return Err(Error::NotConnected);
        };
        debug!("Spawned {} (pid {})", executable, child.id());

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

impl Transport for PipeTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stdin
            .write_all(data)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| Error::io("failed to write to emulator stdin", e))
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        self.stdout
            .read_until(b'\n', &mut line)
            .map_err(|e| Error::io("failed to read from emulator stdout", e))?;
        Ok(line)
    }

    fn connect(&mut self, _target: &str) -> Result<bool> {
        Ok(false)
    }

    /// The process is told to exit with `Quit`; nothing is killed here. An
    /// already-exited child is reaped.
    fn close(&mut self) -> Result<()> {
        match self.child.try_wait() {
            Ok(Some(status)) => debug!("Emulator exited with {}", status),
            Ok(None) => debug!("Emulator (pid {}) still running at close", self.child.id()),
            Err(e) => debug!("Could not check emulator status: {}", e),
        }
        Ok(())
    }
}
