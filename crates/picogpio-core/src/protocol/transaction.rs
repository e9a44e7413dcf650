//! Transaction engine
//!
//! One transaction is a command write followed by a bounded wait for the
//! board's answer. Boards print unsolicited diagnostics at any time, so every
//! line is classified: `A`/`E` lines end the transaction immediately, other
//! non-empty lines are only kept as a fallback in case nothing better shows up.

use std::time::{Duration, Instant};

use super::transport::Transport;
use super::{Command, ProtocolError, Response};

/// Run one request/response cycle on `transport`.
///
/// Never fails because of a timeout: if no terminator arrives before
/// `timeout`, the result is [`Response::Degraded`] holding the last noise line
/// seen, or [`Response::Timeout`] if the board stayed silent.
pub fn execute(
    transport: &mut dyn Transport,
    command: &Command,
    timeout: Duration,
) -> Result<Response, ProtocolError> {
    transport.drain()?;
    transport.write_all(&command.to_bytes())?;

    let deadline = Instant::now() + timeout;
    let mut provisional: Option<String> = None;

    while let Some(line) = transport.read_line(deadline)? {
        if line.is_empty() {
            continue;
        }
        if let Some(response) = Response::classify(&line) {
            tracing::debug!("execute: '{}' -> {:?}", command, response);
            return Ok(response);
        }
        tracing::debug!("execute: '{}' ignoring unprefixed line {:?}", command, line);
        provisional = Some(line);
    }

    Ok(match provisional {
        Some(line) => {
            tracing::warn!(
                "execute: '{}' got no acknowledgment on {}, falling back to {:?}",
                command,
                transport.port_name(),
                line
            );
            Response::Degraded(line)
        }
        None => {
            tracing::debug!(
                "execute: '{}' timed out after {}ms",
                command,
                timeout.as_millis()
            );
            Response::Timeout
        }
    })
}

/// Read lines until `matcher` accepts one or `deadline` passes.
///
/// Rejected lines are dropped.
pub fn wait_for_line<T>(
    transport: &mut dyn Transport,
    deadline: Instant,
    mut matcher: impl FnMut(&str) -> Option<T>,
) -> Result<Option<T>, ProtocolError> {
    while let Some(line) = transport.read_line(deadline)? {
        if let Some(value) = matcher(&line) {
            return Ok(Some(value));
        }
        if !line.is_empty() {
            tracing::debug!("wait_for_line: skipping {:?}", line);
        }
    }
    Ok(None)
}
