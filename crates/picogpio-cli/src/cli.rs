//! Command line definition

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use picogpio_core::config::SessionConfig;
use picogpio_core::gpio::{Level, PinMode, Pull};

/// Control a Raspberry Pi Pico running the GPIO serial firmware
#[derive(Parser, Debug)]
#[command(name = "picogpio")]
#[command(version)]
#[command(about = "Control a Raspberry Pi Pico running the GPIO serial firmware")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Connect to this port instead of scanning
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Only accept a scanned board reporting this identity
    #[arg(short = 'e', long, global = true)]
    pub expect_id: Option<String>,

    /// Baud rate
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Transaction timeout in milliseconds
    #[arg(short, long, global = true)]
    pub timeout_ms: Option<u64>,

    /// JSON file with session settings; flags override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Talk to a simulated board instead of real hardware
    #[arg(long, global = true)]
    pub demo: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List candidate and system serial ports
    Ports,

    /// Probe every candidate port for a board identity
    Scan,

    /// Show the board identity, or store a new one
    Id {
        /// New identity (at most 16 bytes; longer values are truncated)
        #[arg(long)]
        set: Option<String>,
    },

    /// Configure a pin as input or output
    Mode {
        pin: u8,
        /// input | output
        mode: PinMode,
    },

    /// Drive a pin high or low
    Write {
        pin: u8,
        /// high | low | 1 | 0 | true | false
        level: Level,
    },

    /// Read a pin
    Read { pin: u8 },

    /// Select a pin's pull resistor
    Pull {
        pin: u8,
        /// pullup | pulldown | disable
        pull: Pull,
    },

    /// Toggle a pin on and off
    Blink {
        /// Pin to toggle (25 is the on-board LED)
        #[arg(default_value_t = 25)]
        pin: u8,

        /// Number of on/off cycles
        #[arg(long, default_value_t = 3)]
        count: u32,

        /// Time spent in each state, in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

impl Cli {
    /// Settings from the config file (if any) with command line overrides applied
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(id) = &self.expect_id {
            config.expected_id = Some(id.clone());
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
            // Probe reads must stay shorter than the transaction timeout
            if config.probe_timeout_ms >= timeout_ms {
                config.probe_timeout_ms = timeout_ms / 2;
            }
        }
        if self.demo {
            config.boot_settle_ms = 0;
        }

        config.validate().context("invalid session settings")?;
        Ok(config)
    }
}
