//! Error types shared across the relay.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The engine process could not be launched.
    Spawn(String),
    /// The engine process is gone; carries the classified death message.
    EngineDied(String),
    /// A line from the engine could not be parsed as a structured record.
    Protocol(String),
    /// A structured record could not be applied to its game tree.
    Sync(String),
    /// Game record serialization or write failure.
    Sgf(String),
    /// File-system or stream I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::EngineDied(msg) => write!(f, "engine died: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Sync(msg) => write!(f, "sync: {msg}"),
            Self::Sgf(msg) => write!(f, "sgf: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("malformed json: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
