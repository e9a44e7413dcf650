//! Protocol commands
//!
//! Defines the single-character opcodes understood by the GPIO firmware and
//! the line encoding used to send them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcodes understood by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Query board identity ('g')
    GetBoardId,

    /// Store a new board identity ('i')
    SetBoardId,

    /// Configure a pin as input or output ('m')
    PinMode,

    /// Drive an output pin ('w')
    DigitalWrite,

    /// Sample a pin ('r')
    DigitalRead,

    /// Select the pull resistor of an input pin ('p')
    PullResistor,
}

impl Opcode {
    /// All opcodes, in table order
    pub const ALL: [Opcode; 6] = [
        Opcode::GetBoardId,
        Opcode::SetBoardId,
        Opcode::PinMode,
        Opcode::DigitalWrite,
        Opcode::DigitalRead,
        Opcode::PullResistor,
    ];

    /// The wire character for this opcode
    pub fn as_char(&self) -> char {
        match self {
            Opcode::GetBoardId => 'g',
            Opcode::SetBoardId => 'i',
            Opcode::PinMode => 'm',
            Opcode::DigitalWrite => 'w',
            Opcode::DigitalRead => 'r',
            Opcode::PullResistor => 'p',
        }
    }

    /// Look up an opcode from its wire character
    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_char() == c)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One request line: an opcode plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    args: Vec<String>,
}

impl Command {
    /// Create a command with no arguments
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: Vec::new(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(value.to_string());
        self
    }

    /// Command letter
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Arguments in wire order
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The request line without its terminator, e.g. `m 25 1`
    pub fn line(&self) -> String {
        let mut line = String::with_capacity(2 + self.args.iter().map(|a| a.len() + 1).sum::<usize>());
        line.push(self.opcode.as_char());
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Convert command to bytes, appending newline for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.line().into_bytes();
        bytes.push(b'\n');
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_chars() {
        assert_eq!(Opcode::GetBoardId.as_char(), 'g');
        assert_eq!(Opcode::SetBoardId.as_char(), 'i');
        assert_eq!(Opcode::PinMode.as_char(), 'm');
        assert_eq!(Opcode::DigitalWrite.as_char(), 'w');
        assert_eq!(Opcode::DigitalRead.as_char(), 'r');
        assert_eq!(Opcode::PullResistor.as_char(), 'p');
    }

    #[test]
    fn test_opcode_lookup() {
        assert_eq!(Opcode::from_char('p'), Some(Opcode::PullResistor));
        assert_eq!(Opcode::from_char('x'), None);
    }

    #[test]
    fn test_command_without_args() {
        let cmd = Command::new(Opcode::GetBoardId);
        assert_eq!(cmd.to_bytes(), b"g\n".to_vec());
    }

    #[test]
    fn test_command_args_are_space_joined() {
        let cmd = Command::new(Opcode::PinMode).arg(25).arg(1);
        assert_eq!(cmd.line(), "m 25 1");
        assert_eq!(cmd.to_bytes(), b"m 25 1\n".to_vec());
        assert_eq!(cmd.args(), ["25".to_string(), "1".to_string()]);
    }
}
