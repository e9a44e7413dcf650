//! # picogpio Core Library
//!
//! Host-side control of Raspberry Pi Pico boards running the GPIO serial
//! firmware.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Discovery of boards on platform-specific serial ports, by identity
//! - Line-oriented command/response transactions with bounded timeouts
//! - Typed GPIO operations (pin mode, read, write, pull resistors)
//! - Board identity management with a local cache
//! - A simulated board for demos and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use picogpio_core::prelude::*;
//!
//! let mut session = Session::new(SessionConfig::default());
//! match session.auto_detect(Some("left-arm")) {
//!     Detection::Connected { port, .. } => println!("found on {port}"),
//!     Detection::NotFound { .. } => return,
//! }
//!
//! session.set_pin_mode(25, PinMode::Output)?;
//! session.digital_write(25, true)?;
//! println!("GP2 is {:?}", session.digital_read(2)?);
//! ```

pub mod config;
pub mod demo;
pub mod discovery;
pub mod gpio;
pub mod protocol;
pub mod session;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::discovery::{PortScanner, ProbeOutcome, ScanResult, SystemPorts};
    pub use crate::gpio::{Level, PinMode, Pull};
    pub use crate::protocol::{ProtocolError, Response};
    pub use crate::session::{Detection, Session, SessionState};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
