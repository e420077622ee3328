//! Tests for config functionality.

use crate::config::Config;
use crate::error::InhibitError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.run_dir, PathBuf::from("/run"));
    assert_eq!(config.poll_interval_ms, 500);
    assert_eq!(config.base_dir(), PathBuf::from("/run/ConsoleKit/inhibit"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
run_dir: /var/run
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.run_dir, PathBuf::from("/var/run"));
    assert_eq!(config.poll_interval_ms, 500);
    assert_eq!(
        config.base_dir(),
        PathBuf::from("/var/run/ConsoleKit/inhibit")
    );
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
run_dir: /tmp/inhibit-test
poll_interval_ms: 50
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.run_dir, PathBuf::from("/tmp/inhibit-test"));
    assert_eq!(config.poll_interval_ms, 50);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
run_dir: /run
future_option: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.run_dir, PathBuf::from("/run"));
}

#[test]
fn test_relative_run_dir_is_rejected() {
    let result = Config::from_yaml("run_dir: run\n");
    let err = result.unwrap_err();
    assert!(matches!(err, InhibitError::Config(_)));
    assert!(err.to_string().contains("absolute"));
}

#[test]
fn test_empty_run_dir_is_rejected() {
    let config = Config {
        run_dir: PathBuf::new(),
        ..Config::default()
    };
    assert!(config.validate().unwrap_err().to_string().contains("empty"));
}

#[test]
fn test_zero_poll_interval_is_rejected() {
    let result = Config::from_yaml("poll_interval_ms: 0\n");
    assert!(result.unwrap_err().to_string().contains("poll_interval_ms"));
}

#[test]
fn test_poll_interval_upper_bound() {
    let result = Config::from_yaml("poll_interval_ms: 60001\n");
    assert!(result.is_err());

    let config = Config::from_yaml("poll_interval_ms: 60000\n").unwrap();
    assert_eq!(config.poll_interval_ms, 60000);
}

#[test]
fn test_invalid_yaml_is_rejected() {
    let result = Config::from_yaml("run_dir: [unterminated\n");
    assert!(matches!(result, Err(InhibitError::Config(_))));
}

#[test]
fn test_yaml_roundtrip() {
    let config = Config::with_run_dir("/tmp/x");
    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_load_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("inhibitor.yaml");
    std::fs::write(&path, "run_dir: /srv/run\npoll_interval_ms: 100\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.run_dir, Path::new("/srv/run"));
    assert_eq!(config.poll_interval_ms, 100);
}

#[test]
fn test_load_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let result = Config::load(temp.path().join("missing.yaml"));
    let err = result.unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
