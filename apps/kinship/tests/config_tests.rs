//! Tests for `kinship.toml` loading and environment overrides.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use kinship::config::{
    Backend, Config, ConfigError, ENV_DATABASE, ENV_LOG_FORMAT, LogFormat,
};
use std::collections::HashMap;
use std::path::PathBuf;

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.storage.database, PathBuf::from("kinship.db"));
    assert_eq!(config.storage.backend, Backend::Redb);
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.logging.filter, "kinship=info");
}

#[test]
fn test_full_config() {
    let config = Config::parse(
        r#"
        [storage]
        database = "family.kin"
        backend = "file"

        [logging]
        format = "json"
        filter = "kinship=debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.database, PathBuf::from("family.kin"));
    assert_eq!(config.storage.backend, Backend::File);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.filter, "kinship=debug");
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = Config::parse("[storage]\nbackend = \"file\"\n").unwrap();
    assert_eq!(config.storage.backend, Backend::File);
    assert_eq!(config.storage.database, PathBuf::from("kinship.db"));
    assert_eq!(config.logging, Config::default().logging);
}

#[test]
fn test_unknown_backend_is_parse_error() {
    let err = Config::parse("[storage]\nbackend = \"sqlite\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_empty_database_is_invalid() {
    let err = Config::parse("[storage]\ndatabase = \"\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_blank_filter_is_invalid() {
    let err = Config::parse("[logging]\nfilter = \"  \"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

// =============================================================================
// FILES
// =============================================================================

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kinship.toml");
    std::fs::write(&path, "[storage]\ndatabase = \"tree.db\"\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.storage.database, PathBuf::from("tree.db"));
}

#[test]
fn test_load_explicit_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[logging]\nformat = \"json\"\n").unwrap();

    let (config, used) = Config::load(Some(path.as_path())).unwrap();
    assert_eq!(used, Some(path));
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile(_)));
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_env_overrides_database_and_format() {
    let mut config = Config::default();
    config.apply_env(lookup(&[(ENV_DATABASE, "/tmp/other.db"), (ENV_LOG_FORMAT, "json")]));

    assert_eq!(config.storage.database, PathBuf::from("/tmp/other.db"));
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_env_empty_database_is_ignored() {
    let mut config = Config::default();
    config.apply_env(lookup(&[(ENV_DATABASE, "")]));
    assert_eq!(config.storage.database, PathBuf::from("kinship.db"));
}

#[test]
fn test_env_unknown_format_falls_back_to_text() {
    let mut config = Config::parse("[logging]\nformat = \"json\"\n").unwrap();
    config.apply_env(lookup(&[(ENV_LOG_FORMAT, "pretty")]));
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_env_absent_changes_nothing() {
    let mut config = Config::default();
    config.apply_env(lookup(&[]));
    assert_eq!(config, Config::default());
}
