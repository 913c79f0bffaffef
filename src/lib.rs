#![forbid(unsafe_code)]

//! Relay between a KataGo `contribute` engine and a game display.
//!
//! The engine runs as a child process; its JSON output is mirrored into
//! per-game move trees, and one game at a time is replayed for display.

pub mod config;
pub mod display;
pub mod engine;
pub mod errors;
pub mod game;
pub mod sessions;
pub mod sgf;

pub use config::RelayConfig;
pub use errors::{AppError, Result};
