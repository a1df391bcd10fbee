//! Screen-level reads and searches built on [`Session`] primitives.

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::action::Action;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::text::unescape;

/// Model 2 geometry, used until a status line reports the real size.
pub const DEFAULT_SCREEN_SIZE: (u16, u16) = (24, 80);

/// Pause between screen polls in [`Session::wait_until`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl Session {
    /// Screen size as (rows, cols) from the last status.
    pub fn screen_size(&self) -> (u16, u16) {
        self.status().screen_size().unwrap_or(DEFAULT_SCREEN_SIZE)
    }

    /// Reject 1-based positions that fall off the screen.
    pub fn check_limits(&self, row: u16, col: u16, length: usize) -> Result<()> {
        let (rows, cols) = self.screen_size();
        let overflows = usize::from(col) + length > usize::from(cols) + 1;
        if row == 0 || col == 0 || row > rows || col > cols || overflows {
            return Err(Error::OutOfBounds {
                row,
                col,
                length,
                rows,
                cols,
            });
        }
        Ok(())
    }

    /// Bounds-checked [`Session::read_region`].
    pub fn read(&mut self, row: u16, col: u16, length: usize) -> Result<String> {
        self.check_limits(row, col, length)?;
        self.read_region(row, col, length)
    }

    /// Every screen row, top to bottom.
    pub fn screen_rows(&mut self) -> Result<Vec<String>> {
        let reply = self.exec(Action::AsciiScreen)?;
        Ok(reply.data.iter().map(|line| unescape(line)).collect())
    }

    /// The whole screen as one string, rows concatenated.
    pub fn read_all_screen(&mut self) -> Result<String> {
        Ok(self.screen_rows()?.concat())
    }

    /// True if `text` is exactly what is on screen at the position.
    pub fn string_found(&mut self, row: u16, col: u16, text: &str) -> Result<bool> {
        let found = self.read_region(row, col, text.chars().count())?;
        debug!("string_found() saw {:?}", found);
        Ok(found == text)
    }

    /// True if any row contains `text`.
    pub fn search_string(&mut self, text: &str, ignore_case: bool) -> Result<bool> {
        let rows = self.screen_rows()?;
        Ok(rows_contain(&rows, text, ignore_case))
    }

    /// Number of times `text` occurs on screen, counted per row.
    pub fn count_matches(&mut self, text: &str, ignore_case: bool) -> Result<usize> {
        if text.is_empty() {
            return Ok(0);
        }
        let rows = self.screen_rows()?;
        Ok(rows
            .iter()
            .map(|row| fold(row, ignore_case).matches(&fold(text, ignore_case)).count())
            .sum())
    }

    /// Poll the screen until `predicate` accepts its rows.
    ///
    /// Returns the accepted rows, or [`Error::WaitTimeout`] naming `what`.
    pub fn wait_until<F>(
        &mut self,
        what: &str,
        timeout: Duration,
        poll: Duration,
        mut predicate: F,
    ) -> Result<Vec<String>>
    where
        F: FnMut(&[String]) -> bool,
    {
        let start = Instant::now();
        loop {
            let rows = self.screen_rows()?;
            if predicate(&rows) {
                debug!("Found {:?} after {:?}", what, start.elapsed());
                return Ok(rows);
            }
            if start.elapsed() >= timeout {
                return Err(Error::WaitTimeout {
                    what: what.to_string(),
                    timeout,
                });
            }
            thread::sleep(poll);
        }
    }

    /// Wait until `text` shows up anywhere on screen.
    pub fn wait_until_string(&mut self, text: &str, timeout: Duration) -> Result<()> {
        self.wait_until(text, timeout, DEFAULT_POLL_INTERVAL, |rows| {
            rows_contain(rows, text, false)
        })?;
        Ok(())
    }
}

fn fold(text: &str, ignore_case: bool) -> String {
    if ignore_case {
        text.to_lowercase()
    } else {
        text.to_string()
    }
}

fn rows_contain(rows: &[String], text: &str, ignore_case: bool) -> bool {
    let needle = fold(text, ignore_case);
    rows.iter().any(|row| fold(row, ignore_case).contains(&needle))
}
