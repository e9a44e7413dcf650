//! Board identity scheme
//!
//! Boards carry a short persistent name so several identical boards can be
//! told apart. [`IdentityProtocol`] describes how a device family exposes it;
//! [`BoardIdProtocol`] is the `g` / `i <id>` / `AID:<id>` scheme of the Pico
//! GPIO firmware.

use super::{Command, Opcode, ProtocolError};

/// Longest identity the firmware stores, in bytes
pub const MAX_IDENTITY_LEN: usize = 16;

/// Prefix of a successful identity reply
pub const IDENTITY_PREFIX: &str = "AID:";

/// How a device family reports and stores its identity
pub trait IdentityProtocol: Send + Sync {
    /// Request that makes the board report its identity
    fn query(&self) -> Command;

    /// Request that stores `identity` on the board
    fn assign(&self, identity: &str) -> Command;

    /// Extract the identity from a reply line, if the line carries a
    /// non-empty one
    fn parse(&self, line: &str) -> Option<String>;

    /// Longest identity accepted by [`IdentityProtocol::assign`], in bytes
    fn max_len(&self) -> usize {
        MAX_IDENTITY_LEN
    }
}

/// Identity scheme of the Pico GPIO firmware
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardIdProtocol;

impl IdentityProtocol for BoardIdProtocol {
    fn query(&self) -> Command {
        Command::new(Opcode::GetBoardId)
    }

    fn assign(&self, identity: &str) -> Command {
        Command::new(Opcode::SetBoardId).arg(identity)
    }

    fn parse(&self, line: &str) -> Option<String> {
        line.strip_prefix(IDENTITY_PREFIX)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Check that `identity` can travel as the single argument of one command line
pub fn check_identity(identity: &str) -> Result<(), ProtocolError> {
    if identity.is_empty()
        || identity
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ProtocolError::InvalidIdentity(identity.to_string()));
    }
    Ok(())
}

/// Cut `identity` to at most `max_len` bytes without splitting a character.
///
/// Returns the kept prefix and whether anything was dropped.
pub fn truncate_identity(identity: &str, max_len: usize) -> (&str, bool) {
    if identity.len() <= max_len {
        return (identity, false);
    }
    let mut end = max_len;
    while !identity.is_char_boundary(end) {
        end -= 1;
    }
    (&identity[..end], true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_id_commands() {
        let proto = BoardIdProtocol;
        assert_eq!(proto.query().to_bytes(), b"g\n".to_vec());
        assert_eq!(proto.assign("bench-1").to_bytes(), b"i bench-1\n".to_vec());
        assert_eq!(proto.max_len(), 16);
    }

    #[test]
    fn test_parse_requires_full_prefix() {
        let proto = BoardIdProtocol;
        assert_eq!(proto.parse("AID:left-arm").as_deref(), Some("left-arm"));
        assert_eq!(proto.parse("AID:"), None);
        assert_eq!(proto.parse("AID:  "), None);
        assert_eq!(proto.parse("AOK"), None);
        assert_eq!(proto.parse("ID:left-arm"), None);
    }

    #[test]
    fn test_check_identity() {
        assert!(check_identity("left-arm_2").is_ok());
        assert!(check_identity("é").is_ok());
        for bad in ["", "left arm", "X\nw 25 1", "tab\there", "cr\r", "nul\0"] {
            assert!(
                matches!(check_identity(bad), Err(ProtocolError::InvalidIdentity(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_truncate_identity() {
        assert_eq!(truncate_identity("short", 16), ("short", false));
        assert_eq!(
            truncate_identity("ABCDEFGHIJKLMNOPQR", 16),
            ("ABCDEFGHIJKLMNOP", true)
        );
        // 'é' is two bytes and would straddle the limit
        assert_eq!(truncate_identity("abcdefghijklmnoé", 16), ("abcdefghijklmno", true));
    }
}
