//! Transport capabilities
//!
//! A [`Transport`] is one exclusively-owned, open link to a board. A
//! [`PortOpener`] creates transports by port name. The transaction engine and
//! the discovery code only ever talk to these traits, so the real serial
//! backend and the simulated board in [`crate::demo`] are interchangeable.

use std::time::{Duration, Instant};

use super::ProtocolError;

/// Longest line kept in the receive buffer before it is flushed as-is
pub const MAX_LINE_LEN: usize = 1024;

/// An open, line-oriented link to one board
pub trait Transport: Send {
    /// Name of the port this transport was opened on
    fn port_name(&self) -> &str;

    /// False once [`Transport::close`] has been called
    fn is_open(&self) -> bool;

    /// Send raw bytes as one unit
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError>;

    /// Next newline-terminated line, or `None` if nothing arrives before `deadline`.
    ///
    /// Lines are decoded lossily as UTF-8 with the terminator and surrounding
    /// whitespace removed.
    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, ProtocolError>;

    /// Discard all buffered and pending input without blocking
    fn drain(&mut self) -> Result<(), ProtocolError>;

    /// Release the underlying handle. Calling it again does nothing.
    fn close(&mut self);
}

/// Opens transports by port name
pub trait PortOpener: Send {
    /// Open `port` at `baud_rate`, using `read_timeout` for low-level reads
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError>;
}

/// Wait for the firmware's boot banner to finish, then throw it away
pub fn settle(transport: &mut dyn Transport, boot_settle: Duration) -> Result<(), ProtocolError> {
    if !boot_settle.is_zero() {
        tracing::debug!(
            "settle: waiting {}ms on {} for boot output",
            boot_settle.as_millis(),
            transport.port_name()
        );
        std::thread::sleep(boot_settle);
    }
    transport.drain()
}

/// Accumulates partial reads and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// An empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete line, if any
    pub fn next_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None if self.pending.len() >= MAX_LINE_LEN => MAX_LINE_LEN,
            None => return None,
        };
        let raw: Vec<u8> = self.pending.drain(..end).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }

    /// Bytes received but not yet returned as a line
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything buffered, including a partial line
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
