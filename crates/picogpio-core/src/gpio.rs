//! GPIO command set
//!
//! Typed pin operations and board identity management, each expressed as one
//! transaction on a [`Session`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::protocol::identity::{check_identity, truncate_identity, IDENTITY_PREFIX};
use crate::protocol::{Command, Opcode, ProtocolError, Response};
use crate::session::Session;

/// A value that could not be parsed into a GPIO setting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseGpioError {
    kind: &'static str,
    value: String,
}

impl ParseGpioError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinMode {
    /// Read the pin
    Input,
    /// Drive the pin
    Output,
}

impl PinMode {
    /// Wire encoding
    pub fn code(&self) -> u8 {
        match self {
            PinMode::Input => 0,
            PinMode::Output => 1,
        }
    }
}

impl FromStr for PinMode {
    type Err = ParseGpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" | "in" => Ok(PinMode::Input),
            "output" | "out" => Ok(PinMode::Output),
            _ => Err(ParseGpioError::new("pin mode", s)),
        }
    }
}

/// Digital level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Wire encoding
    pub fn code(&self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    /// `"HIGH"` or `"LOW"`, as the firmware prints it
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "LOW",
            Level::High => "HIGH",
        }
    }

    /// Find the level named in a read payload
    fn from_payload(payload: &str) -> Option<Self> {
        if payload.contains("HIGH") {
            Some(Level::High)
        } else if payload.contains("LOW") {
            Some(Level::Low)
        } else {
            None
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Level::High
        } else {
            Level::Low
        }
    }
}

macro_rules! level_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Level {
                fn from(value: $t) -> Self {
                    Level::from(value != 0)
                }
            }
        )*
    };
}

level_from_int!(u8, u16, u32, u64, i32, i64);

impl FromStr for Level {
    type Err = ParseGpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "1" | "true" | "on" => Ok(Level::High),
            "low" | "0" | "false" | "off" => Ok(Level::Low),
            _ => Err(ParseGpioError::new("level", s)),
        }
    }
}

/// Input pull resistor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pull {
    /// Pull up to 3.3V
    Up,
    /// Pull down to ground
    Down,
    /// Plain input, no resistor
    Disabled,
}

impl Pull {
    /// Wire encoding
    pub fn code(&self) -> u8 {
        match self {
            Pull::Up => 0,
            Pull::Down => 1,
            Pull::Disabled => 2,
        }
    }
}

impl FromStr for Pull {
    type Err = ParseGpioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pullup" | "pull-up" | "pull_up" | "up" => Ok(Pull::Up),
            "pulldown" | "pull-down" | "pull_down" | "down" => Ok(Pull::Down),
            "disable" | "disabled" | "none" | "off" => Ok(Pull::Disabled),
            _ => Err(ParseGpioError::new("pull resistor", s)),
        }
    }
}

impl Session {
    /// Configure `pin` as input or output (`m <pin> <0|1>`)
    pub fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<Response, ProtocolError> {
        self.execute(&Command::new(Opcode::PinMode).arg(pin).arg(mode.code()))
    }

    /// Drive `pin` high or low (`w <pin> <0|1>`).
    ///
    /// Accepts anything convertible to a [`Level`]: `bool`, integers
    /// (non-zero is high) or a parsed `"high"`/`"low"` string.
    pub fn digital_write(
        &mut self,
        pin: u8,
        value: impl Into<Level>,
    ) -> Result<Response, ProtocolError> {
        let level = value.into();
        self.execute(&Command::new(Opcode::DigitalWrite).arg(pin).arg(level.code()))
    }

    /// Sample `pin` (`r <pin>`). Anything but an acknowledgment naming
    /// `HIGH` or `LOW` yields `None`.
    pub fn digital_read(&mut self, pin: u8) -> Result<Option<Level>, ProtocolError> {
        let response = self.execute(&Command::new(Opcode::DigitalRead).arg(pin))?;
        let level = response.ack_payload().and_then(Level::from_payload);
        if level.is_none() {
            tracing::debug!("digital_read: pin {} gave no level ({})", pin, response);
        }
        Ok(level)
    }

    /// Select the pull resistor of `pin` (`p <pin> <0|1|2>`)
    pub fn set_pull_resistor(&mut self, pin: u8, pull: Pull) -> Result<Response, ProtocolError> {
        self.execute(&Command::new(Opcode::PullResistor).arg(pin).arg(pull.code()))
    }

    /// Board identity, from the cache or by asking the board
    pub fn get_board_id(&mut self) -> Result<Option<String>, ProtocolError> {
        if let Some(id) = self.cached_board_id() {
            return Ok(Some(id.to_string()));
        }

        let query = self.identity_protocol().query();
        let response = self.execute(&query)?;
        let id = match &response {
            Response::Ack(_) => self.identity_protocol().parse(&response.line()),
            _ => None,
        };
        match &id {
            Some(id) => self.cache_board_id(id.clone()),
            None => tracing::debug!(
                "get_board_id: no '{}' reply ({})",
                IDENTITY_PREFIX,
                response
            ),
        }
        Ok(id)
    }

    /// Store a new identity on the board.
    ///
    /// Identities longer than the board accepts are truncated. Empty
    /// identities and ones containing whitespace or control characters fail
    /// with [`ProtocolError::InvalidIdentity`] without reaching the board.
    /// The cache is only updated when the board acknowledges; any other
    /// answer is returned as an error. Returns the identity actually stored.
    pub fn set_board_id(&mut self, board_id: &str) -> Result<String, ProtocolError> {
        if let Err(e) = check_identity(board_id) {
            tracing::warn!("set_board_id: {}", e);
            return Err(e);
        }
        let max_len = self.identity_protocol().max_len();
        let (id, truncated) = truncate_identity(board_id, max_len);
        if truncated {
            tracing::warn!(
                "set_board_id: '{}' exceeds {} bytes, truncated to '{}'",
                board_id,
                max_len,
                id
            );
        }
        let id = id.to_string();

        let command = self.identity_protocol().assign(&id);
        match self.execute(&command)?.require_ack() {
            Ok(_) => {
                tracing::info!("set_board_id: board identity set to '{}'", id);
                self.cache_board_id(id.clone());
                Ok(id)
            }
            Err(e) => {
                tracing::warn!("set_board_id: failed to set '{}': {}", id, e);
                Err(e)
            }
        }
    }
}
