//! Relay configuration parsing, validation, and path expansion.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Pacing and occupancy limits for the display buffer.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CuratorConfig {
    /// Buffered games above which the displayed game is drained faster.
    #[serde(default = "default_max_buffer_games")]
    pub max_buffer_games: usize,
    /// Minimum delay between two displayed moves.
    #[serde(default = "default_move_interval_ms")]
    pub move_interval_ms: u64,
    /// How long a finished game's result stays on screen before eviction.
    #[serde(default = "default_show_result_seconds")]
    pub show_result_seconds: u64,
    /// Idle time after which a game with no new moves is abandoned.
    #[serde(default = "default_give_up_seconds")]
    pub give_up_seconds: u64,
    /// Cadence of curator ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            max_buffer_games: default_max_buffer_games(),
            move_interval_ms: default_move_interval_ms(),
            show_result_seconds: default_show_result_seconds(),
            give_up_seconds: default_give_up_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl CuratorConfig {
    /// Minimum delay between two displayed moves.
    #[must_use]
    pub fn move_interval(&self) -> Duration {
        Duration::from_millis(self.move_interval_ms)
    }

    /// Time a result is shown before the game is evicted.
    #[must_use]
    pub fn show_result(&self) -> Duration {
        Duration::from_secs(self.show_result_seconds)
    }

    /// Idle time before a stuck game is abandoned.
    #[must_use]
    pub fn give_up_after(&self) -> Duration {
        Duration::from_secs(self.give_up_seconds)
    }

    /// Curator tick cadence.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_max_buffer_games() -> usize {
    8
}

fn default_move_interval_ms() -> u64 {
    500
}

fn default_show_result_seconds() -> u64 {
    5
}

fn default_give_up_seconds() -> u64 {
    30
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_executable() -> PathBuf {
    PathBuf::from("~/.katrain/katago")
}

fn default_config_path() -> PathBuf {
    PathBuf::from("~/.katrain/contribute.cfg")
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("~/.katrain/katago_contribute")
}

fn default_max_simultaneous_games() -> u32 {
    6
}

fn default_sgf_dir() -> PathBuf {
    PathBuf::from("./dist_sgf")
}

fn default_shutdown_grace_seconds() -> u64 {
    5
}

/// Relay configuration parsed from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RelayConfig {
    /// Engine executable.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Engine configuration file passed with `-config`.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
    /// Engine working directory passed with `-base-dir`.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Account name the engine contributes games under.
    pub username: String,
    /// Number of games the engine plays concurrently.
    #[serde(default = "default_max_simultaneous_games")]
    pub max_simultaneous_games: u32,
    /// Additional `key=value` engine overrides.
    #[serde(default)]
    pub extra_overrides: BTreeMap<String, String>,
    /// Whether finished games are written to disk on eviction.
    #[serde(default = "default_true")]
    pub save_sgf: bool,
    /// Directory finished games are written to.
    #[serde(default = "default_sgf_dir")]
    pub sgf_dir: PathBuf,
    /// Grace period between terminate and kill during shutdown.
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
    /// Display buffer policy.
    #[serde(default)]
    pub curator: CuratorConfig,
}

impl RelayConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and expand `~/` paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Grace period between terminate and kill during shutdown.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// Engine `-override-config` settings, including the mandatory ones.
    ///
    /// Explicit `username` and `maxSimultaneousGames` always win over
    /// entries of the same name in `extra_overrides`.
    #[must_use]
    pub fn override_settings(&self) -> BTreeMap<String, String> {
        let mut settings = self.extra_overrides.clone();
        settings.insert("username".into(), self.username.clone());
        settings.insert(
            "maxSimultaneousGames".into(),
            self.max_simultaneous_games.to_string(),
        );
        settings
    }

    fn validate(&mut self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(AppError::Config("executable must not be empty".into()));
        }

        if self.username.trim().is_empty() {
            return Err(AppError::Config("username must not be empty".into()));
        }

        if self.max_simultaneous_games == 0 {
            return Err(AppError::Config(
                "max_simultaneous_games must be greater than zero".into(),
            ));
        }

        if self.curator.max_buffer_games == 0 {
            return Err(AppError::Config(
                "curator.max_buffer_games must be greater than zero".into(),
            ));
        }

        if self.curator.tick_interval_ms == 0 {
            return Err(AppError::Config(
                "curator.tick_interval_ms must be greater than zero".into(),
            ));
        }

        if self.curator.give_up_after() <= self.curator.move_interval() {
            return Err(AppError::Config(
                "curator.give_up_seconds must exceed the move interval".into(),
            ));
        }

        self.executable = expand_home(&self.executable);
        self.config_path = expand_home(&self.config_path);
        self.base_dir = expand_home(&self.base_dir);
        self.sgf_dir = expand_home(&self.sgf_dir);

        Ok(())
    }
}

/// Expand a leading `~/` against `HOME`; other paths are returned unchanged.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
