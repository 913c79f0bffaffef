use std::io::Write as _;
use std::path::PathBuf;

use contribute_relay::config::{expand_home, CuratorConfig, RelayConfig};
use contribute_relay::AppError;

fn full_toml() -> &'static str {
    r#"
executable = "/opt/katago/katago"
config_path = "/opt/katago/contribute.cfg"
base_dir = "/var/lib/katago"
username = "alice"
max_simultaneous_games = 4
save_sgf = false
sgf_dir = "/tmp/games"
shutdown_grace_seconds = 2

[extra_overrides]
logGamesAsJson = "true"

[curator]
max_buffer_games = 5
move_interval_ms = 250
show_result_seconds = 3
give_up_seconds = 20
tick_interval_ms = 50
"#
}

fn expect_config_error(raw: &str, needle: &str) {
    let err = RelayConfig::from_toml_str(raw).expect_err("config must be rejected");
    let AppError::Config(msg) = err else {
        panic!("expected config error, got {err:?}");
    };
    assert!(msg.contains(needle), "`{msg}` should mention `{needle}`");
}

#[test]
fn full_config_parses() {
    let config = RelayConfig::from_toml_str(full_toml()).expect("config parses");

    assert_eq!(config.executable, PathBuf::from("/opt/katago/katago"));
    assert_eq!(config.config_path, PathBuf::from("/opt/katago/contribute.cfg"));
    assert_eq!(config.base_dir, PathBuf::from("/var/lib/katago"));
    assert_eq!(config.username, "alice");
    assert_eq!(config.max_simultaneous_games, 4);
    assert!(!config.save_sgf);
    assert_eq!(config.sgf_dir, PathBuf::from("/tmp/games"));
    assert_eq!(config.shutdown_grace().as_secs(), 2);
    assert_eq!(
        config.extra_overrides.get("logGamesAsJson").map(String::as_str),
        Some("true")
    );
    assert_eq!(config.curator.max_buffer_games, 5);
    assert_eq!(config.curator.move_interval().as_millis(), 250);
    assert_eq!(config.curator.show_result().as_secs(), 3);
    assert_eq!(config.curator.give_up_after().as_secs(), 20);
    assert_eq!(config.curator.tick_interval().as_millis(), 50);
}

#[test]
fn minimal_config_uses_defaults() {
    let config = RelayConfig::from_toml_str(r#"username = "alice""#).expect("config parses");

    assert_eq!(config.max_simultaneous_games, 6);
    assert!(config.save_sgf);
    assert_eq!(config.sgf_dir, PathBuf::from("./dist_sgf"));
    assert_eq!(config.shutdown_grace().as_secs(), 5);
    assert!(config.extra_overrides.is_empty());
    assert_eq!(config.curator, CuratorConfig::default());
    assert!(config.executable.ends_with(".katrain/katago"));
}

#[test]
fn curator_defaults_match_engine_pacing() {
    let curator = CuratorConfig::default();

    assert_eq!(curator.max_buffer_games, 8);
    assert_eq!(curator.move_interval().as_millis(), 500);
    assert_eq!(curator.show_result().as_secs(), 5);
    assert_eq!(curator.give_up_after().as_secs(), 30);
    assert_eq!(curator.tick_interval().as_millis(), 100);
}

#[test]
fn home_prefix_is_expanded() {
    let Some(home) = std::env::var_os("HOME") else {
        return;
    };
    let config = RelayConfig::from_toml_str(r#"username = "alice""#).unwrap();

    assert!(config.executable.starts_with(&home));
    assert_eq!(
        expand_home(&PathBuf::from("~/games")),
        PathBuf::from(home).join("games")
    );
}

#[test]
fn paths_without_home_prefix_are_unchanged() {
    assert_eq!(
        expand_home(&PathBuf::from("/abs/path")),
        PathBuf::from("/abs/path")
    );
    assert_eq!(
        expand_home(&PathBuf::from("relative/~/path")),
        PathBuf::from("relative/~/path")
    );
}

#[test]
fn missing_username_is_rejected() {
    let err = RelayConfig::from_toml_str("max_simultaneous_games = 2").unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn blank_username_is_rejected() {
    expect_config_error(r#"username = "  ""#, "username");
}

#[test]
fn empty_executable_is_rejected() {
    expect_config_error(
        r#"
username = "alice"
executable = ""
"#,
        "executable",
    );
}

#[test]
fn zero_simultaneous_games_is_rejected() {
    expect_config_error(
        r#"
username = "alice"
max_simultaneous_games = 0
"#,
        "max_simultaneous_games",
    );
}

#[test]
fn zero_buffer_is_rejected() {
    expect_config_error(
        r#"
username = "alice"
[curator]
max_buffer_games = 0
"#,
        "max_buffer_games",
    );
}

#[test]
fn zero_tick_interval_is_rejected() {
    expect_config_error(
        r#"
username = "alice"
[curator]
tick_interval_ms = 0
"#,
        "tick_interval_ms",
    );
}

#[test]
fn give_up_must_exceed_move_interval() {
    expect_config_error(
        r#"
username = "alice"
[curator]
move_interval_ms = 2000
give_up_seconds = 2
"#,
        "give_up_seconds",
    );
}

#[test]
fn invalid_toml_is_a_config_error() {
    expect_config_error("username = ", "invalid config");
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(full_toml().as_bytes()).unwrap();

    let config = RelayConfig::load_from_path(file.path()).expect("config loads");

    assert_eq!(config.username, "alice");
}

#[test]
fn load_from_missing_path_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RelayConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();

    let AppError::Config(msg) = err else {
        panic!("expected config error, got {err:?}");
    };
    assert!(msg.contains("failed to read config"));
}

#[test]
fn override_settings_always_carry_username_and_games() {
    let raw = r#"
username = "alice"
max_simultaneous_games = 3

[extra_overrides]
username = "mallory"
logGamesAs = "json"
"#;
    let config = RelayConfig::from_toml_str(raw).unwrap();

    let settings = config.override_settings();

    assert_eq!(settings.get("username").map(String::as_str), Some("alice"));
    assert_eq!(
        settings.get("maxSimultaneousGames").map(String::as_str),
        Some("3")
    );
    assert_eq!(settings.get("logGamesAs").map(String::as_str), Some("json"));
}
