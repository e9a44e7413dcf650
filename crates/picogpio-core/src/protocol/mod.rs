//! Serial Protocol Communication
//!
//! Implements the line-oriented ASCII protocol of the Pico GPIO firmware:
//! a single-character opcode followed by space-separated arguments, answered
//! by an `A` (acknowledge) or `E` (error) line.

pub mod commands;
mod error;
pub mod identity;
mod response;
pub mod serial;
pub mod transaction;
pub mod transport;

pub use commands::{Command, Opcode};
pub use error::ProtocolError;
pub use identity::{check_identity, BoardIdProtocol, IdentityProtocol, MAX_IDENTITY_LEN};
pub use response::Response;
pub use serial::{list_ports, PortInfo, SerialOpener, SerialTransport};
pub use transaction::execute;
pub use transport::{PortOpener, Transport};

/// Default baud rate of the firmware's USB serial console
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default timeout for a transaction in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Read timeout of the transient connections opened while probing
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;

/// How long a probe waits for the identity reply
pub const DEFAULT_PROBE_WINDOW_MS: u64 = 2000;

/// Wait after opening a port before the firmware accepts commands
pub const DEFAULT_BOOT_SETTLE_MS: u64 = 2000;
