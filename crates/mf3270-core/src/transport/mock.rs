//! In-memory transport replaying canned emulator output.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use super::Transport;
use crate::error::{Error, Result};

/// Everything the code under test did to the transport.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub writes: Vec<String>,
    pub connects: Vec<String>,
    pub closes: usize,
    /// Total number of trait calls of any kind.
    pub calls: usize,
}

enum Step {
    Line(Vec<u8>),
    Fail(io::ErrorKind),
}

pub(crate) struct ScriptedTransport {
    steps: VecDeque<Step>,
    write_failure: Option<io::ErrorKind>,
    connects_itself: bool,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let transport = Self {
            steps: VecDeque::new(),
            write_failure: None,
            connects_itself: false,
            journal: journal.clone(),
        };
        (transport, journal)
    }

    /// Behave like a socket transport: `connect` returns `true`.
    pub fn connecting(mut self) -> Self {
        self.connects_itself = true;
        self
    }

    pub fn push_line(&mut self, line: &[u8]) {
        self.steps.push_back(Step::Line(line.to_vec()));
    }

    /// Queue a complete reply.
    pub fn reply(&mut self, data: &[&str], status: &str, outcome: &str) {
        for line in data {
            self.push_line(format!("data: {}\n", line).as_bytes());
        }
        self.push_line(format!("{}\n", status).as_bytes());
        self.push_line(format!("{}\n", outcome).as_bytes());
    }

    /// Queue a read failure.
    pub fn fail_read(&mut self, kind: io::ErrorKind) {
        self.steps.push_back(Step::Fail(kind));
    }

    /// Make every write fail.
    pub fn fail_writes(&mut self, kind: io::ErrorKind) {
        self.write_failure = Some(kind);
    }

    fn record(&self, f: impl FnOnce(&mut Journal)) {
        let mut journal = self.journal.lock().unwrap();
        journal.calls += 1;
        f(&mut journal);
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.record(|j| j.writes.push(String::from_utf8_lossy(data).into_owned()));
        match self.write_failure {
            Some(kind) => Err(Error::io("failed to write", io::Error::from(kind))),
            None => Ok(()),
        }
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        self.record(|_| {});
        match self.steps.pop_front() {
            Some(Step::Line(line)) => Ok(line),
            Some(Step::Fail(kind)) => Err(Error::io("failed to read", io::Error::from(kind))),
            // Peer closed its end
            None => Ok(Vec::new()),
        }
    }

    fn connect(&mut self, target: &str) -> Result<bool> {
        self.record(|j| j.connects.push(target.to_string()));
        Ok(self.connects_itself)
    }

    fn close(&mut self) -> Result<()> {
        self.record(|j| j.closes += 1);
        Ok(())
    }
}
