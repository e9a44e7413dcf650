//! Candidate port enumeration
//!
//! Boards show up under different device names on each operating system.
//! Unix-like systems are scanned by matching device-file prefixes in `/dev`;
//! Windows gets a bounded sweep of COM port names.

use std::fs;
use std::path::{Path, PathBuf};

use crate::protocol::serial::numeric_suffix;

/// Highest COM port number tried on Windows
pub const WINDOWS_COM_SWEEP: u32 = 20;

/// Operating system family, for port naming conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// USB CDC and USB serial devices under `/dev`
    Linux,
    /// Call-out devices under `/dev`
    MacOs,
    /// `COM` ports
    Windows,
    /// No known naming convention; nothing is scanned
    Unsupported,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unsupported
        }
    }

    /// Device-file prefixes scanned on this platform, in priority order
    pub fn device_prefixes(&self) -> &'static [&'static str] {
        match self {
            Platform::Linux => &["ttyACM", "ttyUSB"],
            Platform::MacOs => &["cu.usbmodem", "tty.usbserial"],
            Platform::Windows | Platform::Unsupported => &[],
        }
    }
}

/// Source of port names to probe
pub trait PortEnumerator: Send {
    /// Port names in the order they should be probed
    fn candidate_ports(&self) -> Vec<String>;
}

/// Enumerates the ports of the running system
#[derive(Debug, Clone)]
pub struct SystemPorts {
    platform: Platform,
    dev_dir: PathBuf,
}

impl Default for SystemPorts {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl SystemPorts {
    /// Enumerate ports the way `platform` names them
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            dev_dir: PathBuf::from("/dev"),
        }
    }

    /// Look for device files in `dev_dir` instead of `/dev`
    pub fn with_dev_dir(mut self, dev_dir: impl Into<PathBuf>) -> Self {
        self.dev_dir = dev_dir.into();
        self
    }

    /// Platform whose naming is used
    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl PortEnumerator for SystemPorts {
    fn candidate_ports(&self) -> Vec<String> {
        candidate_ports_in(self.platform, &self.dev_dir)
    }
}

/// Candidate ports for `platform`, looking in `/dev` on Unix-like systems
pub fn candidate_ports(platform: Platform) -> Vec<String> {
    candidate_ports_in(platform, Path::new("/dev"))
}

fn candidate_ports_in(platform: Platform, dev_dir: &Path) -> Vec<String> {
    match platform {
        Platform::Windows => (1..=WINDOWS_COM_SWEEP).map(|n| format!("COM{n}")).collect(),
        Platform::Unsupported => {
            tracing::warn!("candidate_ports: unsupported platform, nothing to scan");
            Vec::new()
        }
        Platform::Linux | Platform::MacOs => {
            let names: Vec<String> = match fs::read_dir(dev_dir) {
                Ok(entries) => entries
                    .flatten()
                    .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
                    .collect(),
                Err(e) => {
                    tracing::warn!(
                        "candidate_ports: cannot read {}: {}",
                        dev_dir.display(),
                        e
                    );
                    return Vec::new();
                }
            };

            let mut ports = Vec::new();
            for prefix in platform.device_prefixes() {
                let mut group: Vec<&String> =
                    names.iter().filter(|n| n.starts_with(prefix)).collect();
                group.sort_by_key(|n| (numeric_suffix(n), (*n).clone()));
                ports.extend(
                    group
                        .into_iter()
                        .map(|n| dev_dir.join(n).to_string_lossy().into_owned()),
                );
            }
            ports
        }
    }
}
