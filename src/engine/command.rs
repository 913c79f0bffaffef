//! Engine command line construction.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::config::RelayConfig;

/// Subcommand that puts the engine into distributed self-play mode.
pub const CONTRIBUTE_SUBCOMMAND: &str = "contribute";

/// Invocation of the engine process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    /// Engine executable.
    pub executable: PathBuf,
    /// Engine configuration file.
    pub config_path: PathBuf,
    /// Engine working directory.
    pub base_dir: PathBuf,
    /// `key=value` overrides, sorted by key.
    pub overrides: BTreeMap<String, String>,
}

impl EngineCommand {
    /// Build the invocation described by `config`.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            config_path: config.config_path.clone(),
            base_dir: config.base_dir.clone(),
            overrides: config.override_settings(),
        }
    }

    /// The comma-joined `-override-config` value.
    #[must_use]
    pub fn override_arg(&self) -> String {
        self.overrides
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Arguments following the executable.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        vec![
            CONTRIBUTE_SUBCOMMAND.into(),
            "-config".into(),
            self.config_path.clone().into_os_string(),
            "-base-dir".into(),
            self.base_dir.clone().into_os_string(),
            "-override-config".into(),
            self.override_arg().into(),
        ]
    }
}

impl Display for EngineCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" {CONTRIBUTE_SUBCOMMAND} -config \"{}\" -base-dir \"{}\" -override-config \"{}\"",
            self.executable.display(),
            self.config_path.display(),
            self.base_dir.display(),
            self.override_arg()
        )
    }
}
