use std::fs;

use arbor::config::{Config, ConfigError, MAX_DEMO_COUNTERS};
use arbor::store::HistoryPolicy;
use tempfile::TempDir;

/// Test that Config::default() produces the documented values.
#[test]
fn test_config_default_values() {
    let config = Config::default();
    assert_eq!(config.history.max_entries, 0);
    assert_eq!(config.history.policy(), HistoryPolicy::Unbounded);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.demo.counters, 1);
    assert_eq!(config.demo.fact_delay_ms, 10);
}

#[test]
fn test_config_path_ends_with_expected() {
    let path = Config::config_path();
    assert!(path.ends_with("arbor/config.toml"));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let config = Config::load_from(&dir.path().join("absent.toml")).expect("defaults");
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[history]
max_entries = 50

[demo]
counters = 3
"#,
    )
    .expect("write config");

    let config = Config::load_from(&path).expect("load");
    assert_eq!(config.history.policy(), HistoryPolicy::Capped(50));
    assert_eq!(config.demo.counters, 3);
    assert_eq!(config.demo.fact_delay_ms, 10);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[history\nmax_entries = ").expect("write config");

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_validation_rejects_empty_level() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[logging]\nlevel = \"  \"\n").expect("write config");

    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
}

#[test]
fn test_validation_rejects_too_many_counters() {
    let mut config = Config::default();
    config.demo.counters = MAX_DEMO_COUNTERS + 1;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
fn test_directory_path_is_read_error() {
    let dir = TempDir::new().expect("temp dir");
    let err = Config::load_from(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}
