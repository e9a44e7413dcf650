//! Session configuration
//!
//! Loaded from an optional JSON file; every field has a default so partial
//! files are accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{
    DEFAULT_BAUD_RATE, DEFAULT_BOOT_SETTLE_MS, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_PROBE_WINDOW_MS,
    DEFAULT_TIMEOUT_MS,
};

/// Errors while loading a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid settings JSON
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Connection and discovery settings for a [`crate::session::Session`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Connect straight to this port instead of scanning
    pub port: Option<String>,
    /// Only accept a scanned board reporting this identity
    pub expected_id: Option<String>,
    /// Baud rate
    pub baud_rate: u32,
    /// Transaction timeout in milliseconds
    pub timeout_ms: u64,
    /// Read timeout of probe connections in milliseconds
    pub probe_timeout_ms: u64,
    /// How long a probe waits for the identity reply, in milliseconds
    pub probe_window_ms: u64,
    /// Delay after opening a port before talking to the board, in milliseconds
    pub boot_settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: None,
            expected_id: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            probe_window_ms: DEFAULT_PROBE_WINDOW_MS,
            boot_settle_ms: DEFAULT_BOOT_SETTLE_MS,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON document
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be non-zero".into()));
        }
        if self.probe_timeout_ms >= self.timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "probe_timeout_ms ({}) must be shorter than timeout_ms ({})",
                self.probe_timeout_ms, self.timeout_ms
            )));
        }
        Ok(())
    }

    /// Transaction timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read timeout of transient probe connections
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// How long a probe waits for the identity reply
    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }

    /// Wait after opening a port before talking to the board
    pub fn boot_settle(&self) -> Duration {
        Duration::from_millis(self.boot_settle_ms)
    }
}
