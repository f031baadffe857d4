//! Integration tests for configuration loading and persistence.

use webpforge::config::{self, persist, Config};
use webpforge_common::{NamingMode, TargetFormat};

#[test]
fn explicit_path_wins_over_search() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("custom.toml");
    std::fs::write(&path, "[conversion]\nformat = \"jpeg\"\n").unwrap();

    let config = config::load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.conversion.format, TargetFormat::Jpeg);
}

#[test]
fn unknown_format_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bad.toml");
    std::fs::write(&path, "[conversion]\nformat = \"avif\"\n").unwrap();

    assert!(config::load_config(&path).is_err());
}

#[test]
fn saved_config_round_trips() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("webpforge.toml");

    let mut config = Config::default();
    config.export.naming = NamingMode::Suffix;
    config.conversion.encode_timeout_secs = Some(20);
    config.notifications.ttl_ms = 1500;
    persist::save_config(&path, &config).unwrap();

    let loaded = config::load_config(&path).unwrap();
    assert_eq!(loaded.export.naming, NamingMode::Suffix);
    assert_eq!(loaded.conversion.encode_timeout_secs, Some(20));
    assert_eq!(loaded.notifications.ttl_ms, 1500);
    assert_eq!(loaded.limits.max_files, 50);
}

#[test]
fn zero_ttl_is_invalid() {
    let mut config = Config::default();
    config.notifications.ttl_ms = 0;
    assert!(config::validate_config(&config).is_err());
}
