//! Tests for configuration loading and data folder resolution
//!
//! Tests that manipulate LDD_DATA_FOLDER are marked with #[serial]
//! so they do not race each other on the process environment.

use ldd_common::config::{
    database_path, default_data_folder, resolve_data_folder, TomlConfig, DATA_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_full_toml_parses() {
    let text = r#"
        bind_address = "127.0.0.1"
        port = 8080
        data_folder = "/srv/ldd"
        api_key = "node-key"
        admin_key = "admin-key"
        utc_offset_minutes = 120
        subscriber_queue = 4
        keep_alive_secs = 30
        history_limit = 50

        [logging]
        level = "debug"
    "#;

    let config = TomlConfig::from_toml_str(text).unwrap();
    assert_eq!(config.bind_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.data_folder, Some(PathBuf::from("/srv/ldd")));
    assert_eq!(config.api_key.as_deref(), Some("node-key"));
    assert_eq!(config.admin_key.as_deref(), Some("admin-key"));
    assert_eq!(config.utc_offset_minutes, Some(120));
    assert_eq!(config.subscriber_queue, 4);
    assert_eq!(config.keep_alive_secs, 30);
    assert_eq!(config.history_limit, 50);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_load_explicit_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ldd-hub.toml");
    std::fs::write(&path, "port = 5999\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.port, Some(5999));
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");
    assert!(TomlConfig::load(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/ldd-env");
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/ldd-toml")),
        ..TomlConfig::default()
    };

    let folder = resolve_data_folder(Some(Path::new("/tmp/ldd-cli")), &toml);
    assert_eq!(folder, PathBuf::from("/tmp/ldd-cli"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/ldd-env");
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/ldd-toml")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_data_folder(None, &toml), PathBuf::from("/tmp/ldd-env"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_beats_default() {
    env::remove_var(DATA_FOLDER_ENV);
    let toml = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/ldd-toml")),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_data_folder(None, &toml), PathBuf::from("/tmp/ldd-toml"));
}

#[test]
#[serial]
fn test_falls_back_to_compiled_default() {
    env::remove_var(DATA_FOLDER_ENV);
    let folder = resolve_data_folder(None, &TomlConfig::default());
    assert_eq!(folder, default_data_folder());
    assert!(database_path(&folder).ends_with("reports.db"));
}
