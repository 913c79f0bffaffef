//! Unit tests for players, moves, and coordinate conversion.

use contribute_relay::game::{Move, Player, Vertex};
use contribute_relay::AppError;

#[test]
fn player_parses_letters_and_names() {
    assert_eq!(Player::parse("B").unwrap(), Player::Black);
    assert_eq!(Player::parse("w").unwrap(), Player::White);
    assert_eq!(Player::parse("black").unwrap(), Player::Black);
    assert!(matches!(Player::parse("X"), Err(AppError::Sync(_))));
}

#[test]
fn player_opponent_alternates() {
    assert_eq!(Player::Black.opponent(), Player::White);
    assert_eq!(Player::White.opponent(), Player::Black);
}

#[test]
fn gtp_columns_skip_i() {
    assert_eq!(Move::from_gtp("D4", Player::Black).unwrap(), Move::at(Player::Black, 3, 3));
    assert_eq!(Move::from_gtp("H1", Player::White).unwrap(), Move::at(Player::White, 7, 0));
    assert_eq!(Move::from_gtp("J10", Player::White).unwrap(), Move::at(Player::White, 8, 9));
    assert_eq!(Move::from_gtp("t19", Player::Black).unwrap(), Move::at(Player::Black, 18, 18));
}

#[test]
fn gtp_pass_and_resign_are_case_insensitive() {
    assert!(Move::from_gtp("pass", Player::Black).unwrap().is_pass());
    assert!(Move::from_gtp("PASS", Player::Black).unwrap().is_pass());
    assert!(Move::from_gtp("Resign", Player::White).unwrap().is_resign());
}

#[test]
fn invalid_gtp_vertices_are_rejected() {
    for bad in ["", "I5", "A0", "D", "4D", "Z-1"] {
        assert!(
            matches!(Move::from_gtp(bad, Player::Black), Err(AppError::Sync(_))),
            "`{bad}` should be rejected"
        );
    }
}

#[test]
fn signed_or_spaced_rows_are_rejected() {
    for bad in ["D+4", "D 4", "Q+16", "Q1\u{0661}"] {
        assert!(
            matches!(Move::from_gtp(bad, Player::Black), Err(AppError::Sync(_))),
            "`{bad}` should be rejected"
        );
    }
}

#[test]
fn sgf_coordinates_flip_rows() {
    let d4 = Move::from_gtp("D4", Player::Black).unwrap();
    let q16 = Move::from_gtp("Q16", Player::White).unwrap();

    assert_eq!(d4.sgf(19, 19).unwrap(), "dp");
    assert_eq!(q16.sgf(19, 19).unwrap(), "pd");
    assert_eq!(Move::at(Player::Black, 0, 0).sgf(9, 9).unwrap(), "ai");
}

#[test]
fn sgf_coordinates_on_rectangular_board() {
    let mv = Move::at(Player::Black, 2, 0);
    assert_eq!(mv.sgf(9, 13).unwrap(), "cm");
}

#[test]
fn pass_and_resign_have_empty_sgf() {
    assert_eq!(Move::pass(Player::Black).sgf(19, 19).unwrap(), "");
    assert_eq!(Move::resign(Player::White).sgf(19, 19).unwrap(), "");
}

#[test]
fn off_board_move_fails_sgf_conversion() {
    let mv = Move::from_gtp("T19", Player::Black).unwrap();
    assert!(matches!(mv.sgf(9, 9), Err(AppError::Sync(_))));
}

#[test]
fn gtp_text_and_display() {
    let mv = Move::from_gtp("J10", Player::White).unwrap();

    assert_eq!(mv.gtp(), "J10");
    assert_eq!(mv.to_string(), "W J10");
    assert_eq!(Move::pass(Player::Black).to_string(), "B pass");
    assert_eq!(Move::resign(Player::White).vertex, Vertex::Resign);
}
