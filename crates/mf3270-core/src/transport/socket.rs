//! Emulator driven through its TCP script port.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use super::Transport;
use crate::error::{Error, Result};

/// How long to keep knocking on the script port while the emulator starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 15,
            backoff: Duration::from_secs(1),
        }
    }
}

/// An emulator launched with `-scriptport`, reached over 127.0.0.1.
pub struct SocketTransport {
    executable: String,
    args: Vec<String>,
    script_port: u16,
    retry: RetryPolicy,
    child: Option<Child>,
    stream: Option<BufReader<TcpStream>>,
}

impl SocketTransport {
    pub fn new(executable: &str, args: Vec<String>, script_port: u16) -> Self {
        Self {
            executable: executable.to_string(),
            args,
            script_port,
            retry: RetryPolicy::default(),
            child: None,
            stream: None,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn spawn(&mut self, target: &str) -> Result<()> {
        let child = Command::new(&self.executable)
            .args(&self.args)
            .arg("-scriptport")
            .arg(self.script_port.to_string())
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Spawn {
                executable: self.executable.clone(),
                source,
            })?;
        debug!("Spawned {} (pid {})", self.executable, child.id());
        self.child = Some(child);
        Ok(())
    }

    /// Kill and reap an emulator that never opened its script port.
    fn stop_child(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            debug!("Could not kill emulator (pid {}): {}", child.id(), e);
        }
        match child.wait() {
            Ok(status) => debug!("Emulator exited with {}", status),
            Err(e) => warn!("Failed to reap emulator: {}", e),
        }
    }

    fn stream(&mut self) -> Result<&mut BufReader<TcpStream>> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }
}

/// Connect to `127.0.0.1:port`, retrying only while the port refuses.
pub fn connect_with_retry(port: u16, retry: RetryPolicy) -> Result<TcpStream> {
    retry_connect(port, retry, |addr| TcpStream::connect(addr))
}

fn retry_connect<F>(port: u16, retry: RetryPolicy, mut connect: F) -> Result<TcpStream>
where
    F: FnMut(SocketAddr) -> io::Result<TcpStream>,
{
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    for attempt in 1..=retry.attempts {
        match connect(addr) {
            Ok(stream) => {
                debug!("Connected to script port {} on attempt {}", port, attempt);
                return Ok(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                warn!(
                    "Script port {} refused connection (attempt {}/{}): {}",
                    port, attempt, retry.attempts, e
                );
                if attempt < retry.attempts {
                    std::thread::sleep(retry.backoff);
                }
            }
            Err(e) => return Err(Error::io("failed to connect to script port", e)),
        }
    }
    Err(Error::ConnectExhausted {
        port,
        attempts: retry.attempts,
    })
}

impl Transport for SocketTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?.get_mut();
        stream
            .write_all(data)
            .and_then(|()| stream.flush())
            .map_err(|e| Error::io("failed to write to script port", e))
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        self.stream()?
            .read_until(b'\n', &mut line)
            .map_err(|e| Error::io("failed to read from script port", e))?;
        Ok(line)
    }

    /// Launch the emulator pointed at `target` and attach to its script
    /// port. Once attached, later connects (reconnect) go through a
    /// `Connect` command instead, so this returns `false`.
    fn connect(&mut self, target: &str) -> Result<bool> {
        if self.stream.is_some() {
            return Ok(false);
        }
        if self.child.is_none() {
            self.spawn(target)?;
        }
        let stream = match connect_with_retry(self.script_port, self.retry) {
            Ok(stream) => stream,
            Err(e) => {
                self.stop_child();
                return Err(e);
            }
        };
        self.stream = Some(BufReader::new(stream));
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            match stream.get_ref().shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
                Err(e) => return Err(Error::io("failed to close script socket", e)),
            }
        }
        if let Some(child) = self.child.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                debug!("Emulator exited with {}", status);
            }
        }
        Ok(())
    }
}
