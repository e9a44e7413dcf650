use picogpio_core::config::SessionConfig;
use picogpio_core::demo::{BoardBehavior, SimulatedBoard, SimulatedBus};
use picogpio_core::gpio::{Level, PinMode, Pull};
use picogpio_core::protocol::{ProtocolError, Response};
use picogpio_core::session::Session;
use pretty_assertions::assert_eq;

fn connected(board: &SimulatedBoard) -> Session {
    let bus = SimulatedBus::new().with_board("/dev/ttyACM0", board.clone());
    let config = SessionConfig {
        timeout_ms: 50,
        probe_timeout_ms: 5,
        probe_window_ms: 50,
        boot_settle_ms: 0,
        ..SessionConfig::default()
    };
    let mut session = Session::with_backend(config, Box::new(bus.clone()), Box::new(bus));
    session.connect("/dev/ttyACM0").unwrap();
    session
}

#[test]
fn test_set_pin_mode_encoding() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);

    assert!(session.set_pin_mode(25, PinMode::Output).unwrap().is_ack());
    assert!(session.set_pin_mode(2, PinMode::Input).unwrap().is_ack());

    assert_eq!(board.received_commands(), vec!["m 25 1", "m 2 0"]);
    assert_eq!(board.pin_mode(25), Some(PinMode::Output));
}

#[test]
fn test_digital_write_normalizes_values() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);

    session.digital_write(25, true).unwrap();
    session.digital_write(25, 1u8).unwrap();
    session.digital_write(25, 1i32).unwrap();
    session
        .digital_write(25, "high".parse::<Level>().unwrap())
        .unwrap();
    session
        .digital_write(25, "HIGH".parse::<Level>().unwrap())
        .unwrap();
    session.digital_write(25, false).unwrap();
    session
        .digital_write(25, "Low".parse::<Level>().unwrap())
        .unwrap();

    assert_eq!(
        board.received_commands(),
        vec!["w 25 1", "w 25 1", "w 25 1", "w 25 1", "w 25 1", "w 25 0", "w 25 0"]
    );
}

#[test]
fn test_digital_read_levels() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);

    session.set_pin_mode(25, PinMode::Output).unwrap();
    session.digital_write(25, true).unwrap();
    assert_eq!(session.digital_read(25).unwrap(), Some(Level::High));

    session.set_pull_resistor(3, Pull::Down).unwrap();
    assert_eq!(session.digital_read(3).unwrap(), Some(Level::Low));

    session.set_pull_resistor(3, Pull::Up).unwrap();
    let level = session.digital_read(3).unwrap();
    assert_eq!(level.map(|l| l.to_string()).as_deref(), Some("HIGH"));
}

#[test]
fn test_digital_read_without_level_is_none() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);
    // Out-of-range pin: the board answers with an error line
    assert_eq!(session.digital_read(40).unwrap(), None);

    let silent = SimulatedBoard::silent();
    let mut session = connected(&silent);
    assert_eq!(session.digital_read(4).unwrap(), None);

    let noisy = SimulatedBoard::new("x")
        .with_behavior(BoardBehavior::DiagnosticOnly("HIGH voltage warning".into()));
    let mut session = connected(&noisy);
    // A degraded line is never trusted, even if it mentions a level
    assert_eq!(session.digital_read(4).unwrap(), None);
}

#[test]
fn test_pull_resistor_encoding() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);

    session.set_pull_resistor(7, "pullup".parse().unwrap()).unwrap();
    session.set_pull_resistor(7, "PULLDOWN".parse().unwrap()).unwrap();
    session.set_pull_resistor(7, "disable".parse().unwrap()).unwrap();

    assert_eq!(board.received_commands(), vec!["p 7 0", "p 7 1", "p 7 2"]);
}

#[test]
fn test_rejected_command_is_error_response() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);
    let response = session.set_pin_mode(99, PinMode::Output).unwrap();
    assert_eq!(response, Response::Error(":bad args".into()));
}

#[test]
fn test_board_id_round_trip() {
    let board = SimulatedBoard::new("old");
    let mut session = connected(&board);

    assert_eq!(session.set_board_id("FOO").unwrap(), "FOO");
    assert_eq!(session.cached_board_id(), Some("FOO"));

    session.clear_identity_cache();
    assert_eq!(session.get_board_id().unwrap().as_deref(), Some("FOO"));
    assert_eq!(board.board_id(), "FOO");
}

#[test]
fn test_get_board_id_uses_cache() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);

    assert_eq!(session.get_board_id().unwrap().as_deref(), Some("bench"));
    assert_eq!(session.get_board_id().unwrap().as_deref(), Some("bench"));

    assert_eq!(board.received_commands(), vec!["g"]);
}

#[test]
fn test_set_board_id_truncates_to_16() {
    let board = SimulatedBoard::new("old");
    let mut session = connected(&board);

    let stored = session.set_board_id("ABCDEFGHIJKLMNOPQR").unwrap();

    assert_eq!(stored, "ABCDEFGHIJKLMNOP");
    assert_eq!(board.received_commands(), vec!["i ABCDEFGHIJKLMNOP"]);
    assert_eq!(board.board_id(), "ABCDEFGHIJKLMNOP");
}

#[test]
fn test_rejected_set_board_id_keeps_cache() {
    let board = SimulatedBoard::new("keep").rejecting_id_writes();
    let mut session = connected(&board);
    assert_eq!(session.get_board_id().unwrap().as_deref(), Some("keep"));

    let err = session.set_board_id("NEW").unwrap_err();

    assert!(matches!(err, ProtocolError::DeviceRejected(_)));
    assert_eq!(session.cached_board_id(), Some("keep"));
    assert_eq!(board.board_id(), "keep");
}

#[test]
fn test_set_board_id_on_silent_board_fails() {
    let board = SimulatedBoard::silent();
    let mut session = connected(&board);
    assert!(matches!(
        session.set_board_id("NEW"),
        Err(ProtocolError::Timeout)
    ));
    assert!(session.cached_board_id().is_none());
}

#[test]
fn test_commands_require_connection() {
    let board = SimulatedBoard::new("bench");
    let mut session = connected(&board);
    session.disconnect();

    assert!(matches!(
        session.digital_write(25, true),
        Err(ProtocolError::NotConnected)
    ));
    assert!(matches!(
        session.get_board_id(),
        Err(ProtocolError::NotConnected)
    ));
}

#[test]
fn test_empty_board_id_is_none() {
    let board = SimulatedBoard::new("");
    let mut session = connected(&board);

    assert_eq!(session.get_board_id().unwrap(), None);
    assert!(session.cached_board_id().is_none());
}

#[test]
fn test_set_board_id_rejects_line_breaks_and_spaces() {
    let board = SimulatedBoard::new("old");
    let mut session = connected(&board);
    session.set_pin_mode(25, PinMode::Output).unwrap();
    assert_eq!(session.get_board_id().unwrap().as_deref(), Some("old"));

    for bad in ["X\nw 25 1", "X\rw 25 1", "left arm", ""] {
        assert!(matches!(
            session.set_board_id(bad),
            Err(ProtocolError::InvalidIdentity(_))
        ));
    }

    // Nothing past the setup reached the board
    assert_eq!(board.received_commands(), vec!["m 25 1", "g"]);
    assert_eq!(board.pin_level(25), Some(Level::Low));
    assert_eq!(board.board_id(), "old");
    assert_eq!(session.cached_board_id(), Some("old"));
}
