//! Scoped output capture.
//!
//! A [`CaptureSink`] is one output channel. [`CaptureSink::begin`] opens a
//! capture scope on it; while the scope is open, everything written through
//! the scope's [`Output`] writers is buffered as lines. Closing the scope
//! (explicitly via [`CaptureScope::finish`] or by dropping it during unwind or
//! after a timeout) releases the channel and detaches every writer handed out
//! for that scope, so a body that is still running cannot leak text into a
//! later capture.
//!
//! Only text written through [`Output`] is captured. The process-wide stdout
//! is never redirected, and a sink shared by several threads admits only one
//! scope at a time: parallel runs need one sink per worker.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Lines captured from exactly one snippet execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedOutput {
    lines: Vec<String>,
}

impl CapturedOutput {
    /// Captured lines in emission order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl From<Vec<String>> for CapturedOutput {
    fn from(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

#[derive(Debug, Default)]
struct Channel {
    /// Session id of the open scope, if any.
    active: Option<u64>,
    next_session: u64,
    lines: Vec<String>,
    partial: Vec<u8>,
}

impl Channel {
    fn push_bytes(&mut self, buf: &[u8]) {
        let mut rest = buf;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            self.complete_line();
            rest = &rest[pos + 1..];
        }
        self.partial.extend_from_slice(rest);
    }

    fn complete_line(&mut self) {
        let mut raw = std::mem::take(&mut self.partial);
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        self.lines.push(String::from_utf8_lossy(&raw).into_owned());
    }

    fn close(&mut self) -> CapturedOutput {
        if !self.partial.is_empty() {
            self.complete_line();
        }
        self.active = None;
        CapturedOutput {
            lines: std::mem::take(&mut self.lines),
        }
    }
}

fn lock(channel: &Mutex<Channel>) -> MutexGuard<'_, Channel> {
    // Writers never panic while holding the lock, so a poisoned channel
    // still holds consistent data.
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One output channel that can host a single capture scope at a time.
///
/// Cloning yields another handle onto the same channel.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    channel: Arc<Mutex<Channel>>,
}

impl CaptureSink {
    /// Create a fresh, independent output channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a capture scope is currently open on this channel.
    pub fn is_active(&self) -> bool {
        lock(&self.channel).active.is_some()
    }

    /// Open a capture scope.
    ///
    /// Fails with [`HarnessError::CaptureAlreadyActive`] if a scope is
    /// already open on this channel; scopes do not nest.
    pub fn begin(&self) -> Result<CaptureScope> {
        let mut channel = lock(&self.channel);
        if channel.active.is_some() {
            return Err(HarnessError::CaptureAlreadyActive);
        }
        channel.next_session += 1;
        let session = channel.next_session;
        channel.active = Some(session);
        channel.lines.clear();
        channel.partial.clear();

        Ok(CaptureScope {
            channel: Arc::clone(&self.channel),
            session,
            released: false,
        })
    }

    /// Run `body` with a capture scope open and return what it wrote.
    ///
    /// The channel is released on every exit path, including unwinding out
    /// of `body`.
    pub fn with_capture<T, F>(&self, body: F) -> Result<(CapturedOutput, T)>
    where
        F: FnOnce(&mut Output) -> T,
    {
        let scope = self.begin()?;
        let mut out = scope.writer();
        let value = body(&mut out);
        Ok((scope.finish(), value))
    }
}

/// An open capture scope. Dropping it releases the channel.
#[derive(Debug)]
pub struct CaptureScope {
    channel: Arc<Mutex<Channel>>,
    session: u64,
    released: bool,
}

impl CaptureScope {
    /// A writer bound to this scope. Writes after the scope closes are dropped.
    pub fn writer(&self) -> Output {
        Output {
            channel: Arc::clone(&self.channel),
            session: self.session,
        }
    }

    /// Close the scope and take the captured lines.
    pub fn finish(mut self) -> CapturedOutput {
        self.release()
    }

    fn release(&mut self) -> CapturedOutput {
        self.released = true;
        let mut channel = lock(&self.channel);
        if channel.active != Some(self.session) {
            return CapturedOutput::default();
        }
        channel.close()
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}

/// The writer a snippet body prints through.
///
/// Implements [`std::io::Write`], so bodies can use `writeln!(out, ...)?`.
#[derive(Debug, Clone)]
pub struct Output {
    channel: Arc<Mutex<Channel>>,
    session: u64,
}

impl Output {
    /// Write one line.
    pub fn line(&mut self, text: impl Display) {
        let mut bytes = text.to_string().into_bytes();
        bytes.push(b'\n');
        self.emit(&bytes);
    }

    /// Whether the scope this writer belongs to is still open.
    pub fn is_attached(&self) -> bool {
        lock(&self.channel).active == Some(self.session)
    }

    fn emit(&self, buf: &[u8]) {
        let mut channel = lock(&self.channel);
        if channel.active == Some(self.session) {
            channel.push_bytes(buf);
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.emit(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
