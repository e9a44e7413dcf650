//! picogpio command line tool
//!
//! Drives a Pico GPIO board from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List candidate ports and what the OS knows about them
//! picogpio ports
//!
//! # Probe every candidate port for a board identity
//! picogpio scan
//!
//! # Rename the board found on a known port
//! picogpio --port /dev/ttyACM0 id --set left-arm
//!
//! # Blink the on-board LED of the board named "left-arm"
//! picogpio --expect-id left-arm blink 25 --count 5
//!
//! # Try everything against a simulated board
//! picogpio --demo read 25
//! ```

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use picogpio_core::demo::{SimulatedBoard, SimulatedBus};
use picogpio_core::discovery::{PortEnumerator, PortScanner, ProbeSettings, SystemPorts};
use picogpio_core::prelude::*;
use picogpio_core::protocol::{list_ports, BoardIdProtocol, PortOpener, SerialOpener};

use cli::{Cli, Commands};

/// Port the simulated board is attached to in demo mode
const DEMO_PORT: &str = "/dev/ttyACM0";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.session_config()?;
    tracing::debug!(?config, demo = cli.demo, "session settings");

    let opener: Box<dyn PortOpener>;
    let enumerator: Box<dyn PortEnumerator>;
    if cli.demo {
        let bus = SimulatedBus::new().with_board(DEMO_PORT, SimulatedBoard::new("DEMO-PICO"));
        opener = Box::new(bus.clone());
        enumerator = Box::new(bus);
    } else {
        opener = Box::new(SerialOpener);
        enumerator = Box::new(SystemPorts::default());
    }

    match cli.command {
        Commands::Ports => {
            print_ports(enumerator.as_ref(), cli.demo);
            Ok(())
        }
        Commands::Scan => {
            let ports = enumerator.candidate_ports();
            if ports.is_empty() {
                println!("No candidate ports found");
                return Ok(());
            }
            let identity = BoardIdProtocol;
            let scanner = PortScanner::new(opener.as_ref(), &identity, ProbeSettings::from(&config));
            for result in scanner.scan(&ports) {
                println!("{result}");
            }
            Ok(())
        }
        command => {
            let mut session = Session::with_backend(config, opener, enumerator);
            connect(&mut session)?;
            run(&mut session, command)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_ports(enumerator: &dyn PortEnumerator, demo: bool) {
    println!("Candidate ports:");
    for port in enumerator.candidate_ports() {
        println!("  {port}");
    }
    if demo {
        return;
    }

    println!("System ports:");
    for info in list_ports() {
        let usb = match (info.vid, info.pid) {
            (Some(vid), Some(pid)) => format!(" [{vid:04x}:{pid:04x}]"),
            _ => String::new(),
        };
        let product = info.product.as_deref().unwrap_or("");
        let pico = if info.is_pico() { " (Raspberry Pi)" } else { "" };
        println!("  {}{} {}{}", info.name, usb, product, pico);
    }
}

fn connect(session: &mut Session) -> Result<()> {
    let detection = session.establish().context("failed to open board connection")?;
    match detection {
        Detection::Connected { port, identity } => {
            match identity {
                Some(id) => eprintln!("Connected to '{id}' on {port}"),
                None => eprintln!("Connected on {port}"),
            }
            Ok(())
        }
        Detection::NotFound { scanned } => {
            for result in &scanned {
                eprintln!("  {result}");
            }
            match &session.config().expected_id {
                Some(id) => bail!("no board with identity '{id}' found"),
                None => bail!("no board found"),
            }
        }
    }
}

fn run(session: &mut Session, command: Commands) -> Result<()> {
    match command {
        Commands::Id { set: Some(new_id) } => {
            let stored = session.set_board_id(&new_id)?;
            println!("{stored}");
        }
        Commands::Id { set: None } => match session.get_board_id()? {
            Some(id) => println!("{id}"),
            None => bail!("board did not report an identity"),
        },
        Commands::Mode { pin, mode } => {
            report(session.set_pin_mode(pin, mode)?)?;
        }
        Commands::Write { pin, level } => {
            report(session.digital_write(pin, level)?)?;
        }
        Commands::Read { pin } => match session.digital_read(pin)? {
            Some(level) => println!("{level}"),
            None => bail!("no level reported for pin {pin}"),
        },
        Commands::Pull { pin, pull } => {
            report(session.set_pull_resistor(pin, pull)?)?;
        }
        Commands::Blink {
            pin,
            count,
            interval_ms,
        } => {
            let interval = Duration::from_millis(interval_ms);
            report(session.set_pin_mode(pin, PinMode::Output)?)?;
            for _ in 0..count {
                report(session.digital_write(pin, Level::High)?)?;
                thread::sleep(interval);
                report(session.digital_write(pin, Level::Low)?)?;
                thread::sleep(interval);
            }
        }
        Commands::Ports | Commands::Scan => unreachable!("handled before connecting"),
    }
    session.disconnect();
    Ok(())
}

/// Print an acknowledgment, fail on anything else
fn report(response: Response) -> Result<()> {
    match response {
        Response::Ack(payload) if payload.is_empty() => println!("ok"),
        Response::Ack(payload) => println!("{payload}"),
        other => {
            other.require_ack()?;
        }
    }
    Ok(())
}
