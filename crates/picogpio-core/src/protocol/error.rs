//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to a board
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The serial driver reported a failure
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// No device behind the port name
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// The OS refused access to the port
    #[error("Permission denied opening {0}")]
    PermissionDenied(String),

    /// Opening the port failed for another reason
    #[error("Connection to {port} failed: {reason}")]
    ConnectionFailed {
        /// Port that failed to open
        port: String,
        /// Driver message
        reason: String,
    },

    /// No open connection
    #[error("Not connected to a board")]
    NotConnected,

    /// The board did not answer in time
    #[error("No response before timeout")]
    Timeout,

    /// The board answered with something other than an acknowledgment
    #[error("Unexpected response from board: '{0}'")]
    InvalidResponse(String),

    /// The board answered with an error line
    #[error("Board rejected command: {0}")]
    DeviceRejected(String),

    /// Identity is empty or contains whitespace or control characters
    #[error("Invalid board identity: {0:?}")]
    InvalidIdentity(String),

    /// I/O failure on an open port
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for failures of the link itself rather than of a single exchange
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::SerialError(_)
                | ProtocolError::PortNotFound(_)
                | ProtocolError::PermissionDenied(_)
                | ProtocolError::ConnectionFailed { .. }
                | ProtocolError::NotConnected
                | ProtocolError::IoError(_)
        )
    }

    /// Map a `serialport` open failure onto the connection error kinds
    pub(crate) fn from_open_error(port: &str, err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(port.to_string()),
            serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                ProtocolError::PortNotFound(port.to_string())
            }
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                ProtocolError::PermissionDenied(port.to_string())
            }
            _ => ProtocolError::ConnectionFailed {
                port: port.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(err: serialport::Error) -> Self {
        ProtocolError::SerialError(err.to_string())
    }
}
