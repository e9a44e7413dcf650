//! Session management
//!
//! A [`Session`] owns at most one open connection to a board, found either by
//! scanning candidate ports or by naming the port directly. It also caches the
//! board identity so repeated lookups do not cost a round-trip.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::discovery::{PortEnumerator, PortScanner, ProbeSettings, ScanResult, SystemPorts};
use crate::protocol::transport::settle;
use crate::protocol::{
    transaction, BoardIdProtocol, Command, IdentityProtocol, PortOpener, ProtocolError, Response,
    SerialOpener, Transport,
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No open connection
    Disconnected,
    /// Scanning ports for a board
    Probing,
    /// Connected and ready
    Connected,
}

/// Outcome of [`Session::auto_detect`]
#[must_use = "auto-detection may find no board; check the outcome"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// A board was found and the session is connected to it
    Connected {
        /// Port of the persistent connection
        port: String,
        /// Identity reported by the board, if known
        identity: Option<String>,
    },
    /// No matching board answered; holds what each port reported
    NotFound {
        /// Outcome per scanned port, in scan order
        scanned: Vec<ScanResult>,
    },
}

impl Detection {
    /// True when a board was found
    pub fn is_connected(&self) -> bool {
        matches!(self, Detection::Connected { .. })
    }
}

/// Connection to one GPIO board
pub struct Session {
    config: SessionConfig,
    opener: Box<dyn PortOpener>,
    enumerator: Box<dyn PortEnumerator>,
    identity: Box<dyn IdentityProtocol>,
    transport: Option<Box<dyn Transport>>,
    state: SessionState,
    board_id: Option<String>,
}

impl Session {
    /// Create a session on the system's serial ports (not yet connected)
    pub fn new(config: SessionConfig) -> Self {
        Self::with_backend(config, Box::new(SerialOpener), Box::new(SystemPorts::default()))
    }

    /// Create a session with custom port opening and enumeration
    pub fn with_backend(
        config: SessionConfig,
        opener: Box<dyn PortOpener>,
        enumerator: Box<dyn PortEnumerator>,
    ) -> Self {
        Self {
            config,
            opener,
            enumerator,
            identity: Box::new(BoardIdProtocol),
            transport: None,
            state: SessionState::Disconnected,
            board_id: None,
        }
    }

    /// Use a different identity scheme
    pub fn with_identity_protocol(mut self, identity: Box<dyn IdentityProtocol>) -> Self {
        self.identity = identity;
        self
    }

    /// Settings this session was created with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while a connection is open
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Port of the open connection
    pub fn port_name(&self) -> Option<&str> {
        self.transport.as_ref().map(|t| t.port_name())
    }

    /// Cached board identity, without asking the board
    pub fn cached_board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    /// Forget the cached identity so the next lookup asks the board
    pub fn clear_identity_cache(&mut self) {
        self.board_id = None;
    }

    pub(crate) fn identity_protocol(&self) -> &dyn IdentityProtocol {
        self.identity.as_ref()
    }

    pub(crate) fn cache_board_id(&mut self, id: String) {
        self.board_id = Some(id);
    }

    /// Connect the way the configuration asks for: a fixed port if one is
    /// set, otherwise a scan for `expected_id` (or any board).
    pub fn establish(&mut self) -> Result<Detection, ProtocolError> {
        match self.config.port.clone() {
            Some(port) => {
                self.connect(&port)?;
                Ok(Detection::Connected {
                    port,
                    identity: None,
                })
            }
            None => {
                let expected = self.config.expected_id.clone();
                Ok(self.auto_detect(expected.as_deref()))
            }
        }
    }

    /// Scan candidate ports and connect to the first board whose identity
    /// matches `expected` (any identity when `None`).
    pub fn auto_detect(&mut self, expected: Option<&str>) -> Detection {
        self.disconnect();
        self.state = SessionState::Probing;

        let ports = self.enumerator.candidate_ports();
        tracing::info!("auto_detect: scanning {} candidate port(s)", ports.len());

        let settings = ProbeSettings::from(&self.config);
        let mut scanned = Vec::with_capacity(ports.len());

        for port in ports {
            let result =
                PortScanner::new(self.opener.as_ref(), self.identity.as_ref(), settings).probe(&port);

            if let Some(id) = result.identity() {
                match expected {
                    Some(want) if want != id => {
                        tracing::info!(
                            "auto_detect: {} reports '{}', expected '{}', skipping",
                            port,
                            id,
                            want
                        );
                    }
                    _ => {
                        let id = id.to_string();
                        match self.open_persistent(&port) {
                            Ok(()) => {
                                tracing::info!("auto_detect: connected to '{}' on {}", id, port);
                                self.board_id = Some(id.clone());
                                return Detection::Connected {
                                    port,
                                    identity: Some(id),
                                };
                            }
                            Err(e) => {
                                tracing::warn!("auto_detect: could not reopen {}: {}", port, e);
                            }
                        }
                    }
                }
            }
            scanned.push(result);
        }

        self.state = SessionState::Disconnected;
        match expected {
            Some(want) => tracing::info!("auto_detect: no board with identity '{}' found", want),
            None => tracing::info!("auto_detect: no board found"),
        }
        Detection::NotFound { scanned }
    }

    /// Connect directly to `port`, skipping the scan. The identity stays
    /// unknown until queried.
    pub fn connect(&mut self, port: &str) -> Result<(), ProtocolError> {
        self.disconnect();
        if let Err(e) = self.open_persistent(port) {
            tracing::warn!("connect: {} failed: {}", port, e);
            return Err(e);
        }
        tracing::info!("connect: connected on {}", port);
        Ok(())
    }

    /// Close the open connection, if any
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            tracing::info!("disconnect: closed {}", transport.port_name());
        }
        self.board_id = None;
        self.state = SessionState::Disconnected;
    }

    /// Run one transaction on the open connection
    pub fn execute(&mut self, command: &Command) -> Result<Response, ProtocolError> {
        let timeout = self.config.timeout();
        let transport = self.transport.as_mut().ok_or(ProtocolError::NotConnected)?;
        transaction::execute(transport.as_mut(), command, timeout)
    }

    fn open_persistent(&mut self, port: &str) -> Result<(), ProtocolError> {
        let mut transport = self
            .opener
            .open(port, self.config.baud_rate, self.config.timeout())?;
        if let Err(e) = settle(transport.as_mut(), self.config.boot_settle()) {
            transport.close();
            return Err(e);
        }
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}
