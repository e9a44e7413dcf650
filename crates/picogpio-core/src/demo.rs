//! Demo Mode - Simulated GPIO board for testing
//!
//! Emulates the Pico GPIO firmware in-process so sessions, discovery and the
//! command set can be exercised without hardware. A [`SimulatedBus`] maps port
//! names to boards (or to ports that fail to open) and acts as both the
//! [`PortOpener`] and the [`PortEnumerator`] of a session.
//!
//! Replies are produced synchronously when a command is written, so a
//! simulated transport with nothing queued will never receive more and
//! reports the timeout immediately.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::discovery::PortEnumerator;
use crate::gpio::{Level, PinMode, Pull};
use crate::protocol::{Opcode, PortOpener, ProtocolError, Transport, MAX_IDENTITY_LEN};

/// Number of GPIO pins on the board (GP0..GP29)
pub const NUM_PINS: usize = 30;

/// Lines printed by the firmware right after the port opens
pub const BOOT_BANNER: [&str; 2] = ["Pico GPIO firmware ready", "Type commands: g i m w r p"];

/// How a simulated board answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardBehavior {
    /// Answers every command normally
    Normal,
    /// Never answers
    Silent,
    /// Prints this diagnostic line before and after every answer
    Chatty(String),
    /// Prints only this diagnostic line, never an `A`/`E` answer
    DiagnosticOnly(String),
}

#[derive(Debug, Clone, Copy)]
struct PinState {
    mode: PinMode,
    pull: Pull,
    level: Level,
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            mode: PinMode::Input,
            pull: Pull::Disabled,
            level: Level::Low,
        }
    }
}

impl PinState {
    fn read(&self) -> Level {
        match (self.mode, self.pull) {
            (PinMode::Output, _) => self.level,
            (PinMode::Input, Pull::Up) => Level::High,
            (PinMode::Input, Pull::Down | Pull::Disabled) => Level::Low,
        }
    }
}

#[derive(Debug)]
struct BoardState {
    board_id: String,
    behavior: BoardBehavior,
    reject_id_writes: bool,
    pins: [PinState; NUM_PINS],
    received: Vec<String>,
    open_handles: usize,
}

/// A simulated board. Clones share the same state.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoard {
    /// A board that answers normally and reports `board_id`
    pub fn new(board_id: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState {
                board_id: board_id.to_string(),
                behavior: BoardBehavior::Normal,
                reject_id_writes: false,
                pins: [PinState::default(); NUM_PINS],
                received: Vec::new(),
                open_handles: 0,
            })),
        }
    }

    /// A board that never answers
    pub fn silent() -> Self {
        Self::new("").with_behavior(BoardBehavior::Silent)
    }

    /// Change how the board answers
    pub fn with_behavior(self, behavior: BoardBehavior) -> Self {
        self.lock().behavior = behavior;
        self
    }

    /// Answer identity writes with an error
    pub fn rejecting_id_writes(self) -> Self {
        self.lock().reject_id_writes = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Identity currently stored on the board
    pub fn board_id(&self) -> String {
        self.lock().board_id.clone()
    }

    /// Every command line received so far, without terminators
    pub fn received_commands(&self) -> Vec<String> {
        self.lock().received.clone()
    }

    /// Number of transports currently open on this board
    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }

    /// Level a read of `pin` would report
    pub fn pin_level(&self, pin: u8) -> Option<Level> {
        self.lock().pins.get(pin as usize).map(PinState::read)
    }

    /// Direction `pin` is configured for
    pub fn pin_mode(&self, pin: u8) -> Option<PinMode> {
        self.lock().pins.get(pin as usize).map(|p| p.mode)
    }

    /// Open a transport to this board, queueing the boot banner
    pub fn connect(&self, port_name: &str) -> SimulatedTransport {
        let mut state = self.lock();
        state.open_handles += 1;
        let pending = match state.behavior {
            BoardBehavior::Silent => VecDeque::new(),
            _ => BOOT_BANNER.iter().map(|l| l.to_string()).collect(),
        };
        drop(state);
        SimulatedTransport {
            board: self.clone(),
            port_name: port_name.to_string(),
            pending,
            open: true,
        }
    }

    /// Handle one command line and return the lines the firmware prints
    fn respond(&self, line: &str) -> Vec<String> {
        let mut state = self.lock();
        state.received.push(line.to_string());

        let answer = match state.behavior.clone() {
            BoardBehavior::Silent => return Vec::new(),
            BoardBehavior::DiagnosticOnly(noise) => return vec![noise],
            BoardBehavior::Normal | BoardBehavior::Chatty(_) => handle_command(&mut state, line),
        };

        match &state.behavior {
            BoardBehavior::Chatty(noise) => vec![noise.clone(), answer, noise.clone()],
            _ => vec![answer],
        }
    }
}

fn handle_command(state: &mut BoardState, line: &str) -> String {
    let mut chars = line.chars();
    let opcode = chars.next().and_then(Opcode::from_char);
    let rest = chars.as_str().trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    let pin_arg = |idx: usize| -> Option<usize> {
        args.get(idx)
            .and_then(|a| a.parse::<usize>().ok())
            .filter(|&p| p < NUM_PINS)
    };
    let code_arg = |idx: usize| args.get(idx).and_then(|a| a.parse::<u8>().ok());

    match opcode {
        Some(Opcode::GetBoardId) => format!("AID:{}", state.board_id),
        Some(Opcode::SetBoardId) => {
            if state.reject_id_writes {
                "E:ID write failed".to_string()
            } else if rest.is_empty() || rest.len() > MAX_IDENTITY_LEN {
                "E:bad ID".to_string()
            } else {
                state.board_id = rest.to_string();
                format!("AID set to {}", rest)
            }
        }
        Some(Opcode::PinMode) => match (pin_arg(0), code_arg(1)) {
            (Some(pin), Some(0)) => {
                state.pins[pin].mode = PinMode::Input;
                "AOK".to_string()
            }
            (Some(pin), Some(1)) => {
                state.pins[pin].mode = PinMode::Output;
                "AOK".to_string()
            }
            _ => "E:bad args".to_string(),
        },
        Some(Opcode::DigitalWrite) => match (pin_arg(0), code_arg(1)) {
            (Some(pin), Some(v @ (0 | 1))) => {
                state.pins[pin].level = Level::from(v);
                "AOK".to_string()
            }
            _ => "E:bad args".to_string(),
        },
        Some(Opcode::DigitalRead) => match pin_arg(0) {
            Some(pin) => format!("A{}", state.pins[pin].read()),
            None => "E:bad args".to_string(),
        },
        Some(Opcode::PullResistor) => {
            let pull = match code_arg(1) {
                Some(0) => Some(Pull::Up),
                Some(1) => Some(Pull::Down),
                Some(2) => Some(Pull::Disabled),
                _ => None,
            };
            match (pin_arg(0), pull) {
                (Some(pin), Some(pull)) => {
                    state.pins[pin].mode = PinMode::Input;
                    state.pins[pin].pull = pull;
                    "AOK".to_string()
                }
                _ => "E:bad args".to_string(),
            }
        }
        None => "E:unknown command".to_string(),
    }
}

/// Transport connected to a [`SimulatedBoard`]
#[derive(Debug)]
pub struct SimulatedTransport {
    board: SimulatedBoard,
    port_name: String,
    pending: VecDeque<String>,
    open: bool,
}

impl SimulatedTransport {
    /// Lines waiting to be read
    pub fn pending_lines(&self) -> usize {
        self.pending.len()
    }
}

impl Transport for SimulatedTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        let text = String::from_utf8_lossy(data);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let output = self.board.respond(line);
            self.pending.extend(output);
        }
        Ok(())
    }

    fn read_line(&mut self, _deadline: Instant) -> Result<Option<String>, ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        Ok(self.pending.pop_front())
    }

    fn drain(&mut self) -> Result<(), ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.pending.clear();
            let mut state = self.board.lock();
            state.open_handles = state.open_handles.saturating_sub(1);
        }
    }
}

impl Drop for SimulatedTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Board(SimulatedBoard),
    Unavailable(String),
}

#[derive(Debug, Default)]
struct BusState {
    slots: Vec<(String, Slot)>,
    open_attempts: Vec<String>,
}

/// A set of named ports with simulated boards attached.
///
/// Clones share the same ports, so one clone can serve as the opener and
/// another as the enumerator of a session.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    /// A bus with no ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `board` at `port`; ports are enumerated in insertion order
    pub fn with_board(self, port: &str, board: SimulatedBoard) -> Self {
        self.lock().slots.push((port.to_string(), Slot::Board(board)));
        self
    }

    /// Add a port that fails to open with `reason`
    pub fn with_unavailable(self, port: &str, reason: &str) -> Self {
        self.lock()
            .slots
            .push((port.to_string(), Slot::Unavailable(reason.to_string())));
        self
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every port an open was attempted on, in order
    pub fn open_attempts(&self) -> Vec<String> {
        self.lock().open_attempts.clone()
    }

    /// Board attached at `port`
    pub fn board(&self, port: &str) -> Option<SimulatedBoard> {
        self.lock().slots.iter().find_map(|(name, slot)| match slot {
            Slot::Board(board) if name == port => Some(board.clone()),
            _ => None,
        })
    }
}

impl PortOpener for SimulatedBus {
    fn open(
        &self,
        port: &str,
        _baud_rate: u32,
        _read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError> {
        let mut state = self.lock();
        state.open_attempts.push(port.to_string());
        let slot = state
            .slots
            .iter()
            .find(|(name, _)| name == port)
            .map(|(_, slot)| slot.clone());
        drop(state);

        match slot {
            Some(Slot::Board(board)) => Ok(Box::new(board.connect(port))),
            Some(Slot::Unavailable(reason)) => Err(ProtocolError::ConnectionFailed {
                port: port.to_string(),
                reason,
            }),
            None => Err(ProtocolError::PortNotFound(port.to_string())),
        }
    }
}

impl PortEnumerator for SimulatedBus {
    fn candidate_ports(&self) -> Vec<String> {
        self.lock().slots.iter().map(|(name, _)| name.clone()).collect()
    }
}
