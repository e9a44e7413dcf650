//! Board discovery
//!
//! Finds boards by enumerating platform-specific candidate ports and probing
//! each one for its identity.

mod ports;
mod scanner;

pub use ports::{candidate_ports, Platform, PortEnumerator, SystemPorts, WINDOWS_COM_SWEEP};
pub use scanner::{PortScanner, ProbeOutcome, ProbeSettings, ScanResult};
