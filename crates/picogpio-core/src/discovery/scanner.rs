//! Identity prober
//!
//! Opens each candidate port just long enough to ask "who are you?". Any
//! failure on one port is logged and recorded in its [`ScanResult`]; it never
//! stops the scan.

use std::fmt;
use std::time::{Duration, Instant};

use crate::config::SessionConfig;
use crate::protocol::transaction::wait_for_line;
use crate::protocol::transport::settle;
use crate::protocol::{IdentityProtocol, PortOpener, ProtocolError, Transport};

/// What probing one port found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A board answered with this identity
    Found(String),
    /// The port opened but nothing answered the identity query
    NoResponse,
    /// The port could not be used at all
    Failed(String),
}

/// Result of probing one port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Port that was probed
    pub port: String,
    /// What the port answered
    pub outcome: ProbeOutcome,
}

impl ScanResult {
    /// Identity reported by the board, if one answered
    pub fn identity(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Found(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ProbeOutcome::Found(id) => write!(f, "{}: board '{}'", self.port, id),
            ProbeOutcome::NoResponse => write!(f, "{}: no response", self.port),
            ProbeOutcome::Failed(reason) => write!(f, "{}: unavailable ({})", self.port, reason),
        }
    }
}

/// Timing used for transient probe connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Line speed of the transient connection
    pub baud_rate: u32,
    /// Low-level read timeout of the transient connection
    pub read_timeout: Duration,
    /// Wait after opening before the identity query
    pub boot_settle: Duration,
    /// How long to wait for the identity reply
    pub response_window: Duration,
}

impl From<&SessionConfig> for ProbeSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            read_timeout: config.probe_timeout(),
            boot_settle: config.boot_settle(),
            response_window: config.probe_window(),
        }
    }
}

/// Probes ports one at a time for a board identity
pub struct PortScanner<'a> {
    opener: &'a dyn PortOpener,
    identity: &'a dyn IdentityProtocol,
    settings: ProbeSettings,
}

impl<'a> PortScanner<'a> {
    /// Scanner opening ports through `opener` and asking with `identity`
    pub fn new(
        opener: &'a dyn PortOpener,
        identity: &'a dyn IdentityProtocol,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            opener,
            identity,
            settings,
        }
    }

    /// Ask the board on `port` for its identity.
    ///
    /// The transient connection is closed before returning, whatever happened.
    pub fn probe(&self, port: &str) -> ScanResult {
        tracing::info!("probe: checking {}", port);
        let outcome = match self.opener.open(
            port,
            self.settings.baud_rate,
            self.settings.read_timeout,
        ) {
            Ok(mut transport) => {
                let result = self.query_identity(transport.as_mut());
                transport.close();
                match result {
                    Ok(Some(id)) => ProbeOutcome::Found(id),
                    Ok(None) => ProbeOutcome::NoResponse,
                    Err(e) => ProbeOutcome::Failed(e.to_string()),
                }
            }
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        };

        match &outcome {
            ProbeOutcome::Found(id) => tracing::info!("probe: found board '{}' on {}", id, port),
            ProbeOutcome::NoResponse => tracing::debug!("probe: no identity reply on {}", port),
            ProbeOutcome::Failed(reason) => {
                tracing::debug!("probe: skipping {}: {}", port, reason)
            }
        }

        ScanResult {
            port: port.to_string(),
            outcome,
        }
    }

    /// Probe every port in order
    pub fn scan(&self, ports: &[String]) -> Vec<ScanResult> {
        ports.iter().map(|port| self.probe(port)).collect()
    }

    fn query_identity(&self, transport: &mut dyn Transport) -> Result<Option<String>, ProtocolError> {
        settle(transport, self.settings.boot_settle)?;
        transport.write_all(&self.identity.query().to_bytes())?;
        let deadline = Instant::now() + self.settings.response_window;
        wait_for_line(transport, deadline, |line| self.identity.parse(line))
    }
}
