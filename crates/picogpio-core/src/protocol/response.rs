//! Transaction results
//!
//! The firmware answers every request with a line starting with `A`
//! (acknowledgment) or `E` (error). Anything else is diagnostic chatter and
//! only ever surfaces as a [`Response::Degraded`] result.

use std::fmt;

use super::ProtocolError;

/// Prefix of an acknowledgment line
pub const ACK_PREFIX: char = 'A';

/// Prefix of an error line
pub const ERR_PREFIX: char = 'E';

/// Outcome of a single transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `A...` line; holds the text after the prefix
    Ack(String),
    /// `E...` line; holds the text after the prefix
    Error(String),
    /// No terminator before the deadline, but this unprefixed line was seen last
    Degraded(String),
    /// Nothing arrived before the deadline
    Timeout,
}

impl Response {
    /// Classify an authoritative line. Returns `None` for noise.
    pub fn classify(line: &str) -> Option<Self> {
        if let Some(payload) = line.strip_prefix(ACK_PREFIX) {
            Some(Response::Ack(payload.to_string()))
        } else {
            line.strip_prefix(ERR_PREFIX)
                .map(|message| Response::Error(message.to_string()))
        }
    }

    /// True for an acknowledgment
    pub fn is_ack(&self) -> bool {
        matches!(self, Response::Ack(_))
    }

    /// True for an error line
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// True when the result did not come from an `A`/`E` line
    pub fn is_degraded(&self) -> bool {
        matches!(self, Response::Degraded(_) | Response::Timeout)
    }

    /// Acknowledgment payload, if this is an `Ack`
    pub fn ack_payload(&self) -> Option<&str> {
        match self {
            Response::Ack(payload) => Some(payload),
            _ => None,
        }
    }

    /// The line as received (empty for `Timeout`)
    pub fn line(&self) -> String {
        match self {
            Response::Ack(payload) => format!("{ACK_PREFIX}{payload}"),
            Response::Error(message) => format!("{ERR_PREFIX}{message}"),
            Response::Degraded(line) => line.clone(),
            Response::Timeout => String::new(),
        }
    }

    /// Turn anything but an acknowledgment into an error
    pub fn require_ack(self) -> Result<String, ProtocolError> {
        match self {
            Response::Ack(payload) => Ok(payload),
            Response::Error(message) => Err(ProtocolError::DeviceRejected(format!(
                "{ERR_PREFIX}{message}"
            ))),
            Response::Degraded(line) => Err(ProtocolError::InvalidResponse(line)),
            Response::Timeout => Err(ProtocolError::Timeout),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Timeout => f.write_str("<timeout>"),
            Response::Degraded(line) => write!(f, "{line} (unacknowledged)"),
            other => f.write_str(&other.line()),
        }
    }
}
