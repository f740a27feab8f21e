//! Integration tests for `pentaflow config` command.
//!
//! Tests config validation and display inputs with real TOML files.

use std::fs;
use std::path::PathBuf;

use pentaflow_core::config::PentaflowConfig;
use tempfile::TempDir;

fn example_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../pentaflow.toml.example")
}

#[tokio::test]
async fn test_config_validate_shipped_example() {
    let config = PentaflowConfig::load(example_path())
        .await
        .expect("shipped example config should validate");

    assert_eq!(config.backends.len(), 13);
    let white = config
        .profile_backends("white")
        .expect("white profile should exist");
    assert_eq!(white.first().map(|b| b.name.as_str()), Some("nmap"));
}

#[tokio::test]
async fn test_config_validate_minimal_toml() {
    // Given: A file that only overrides a few fields
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("pentaflow.toml");
    fs::write(
        &config_path,
        r#"
[general]
log_level = "debug"
log_format = "json"

[dispatch]
poll_interval_secs = 5
"#,
    )
    .expect("should write config");

    // When: Loading the config
    let config = PentaflowConfig::load(&config_path)
        .await
        .expect("minimal config should load");

    // Then: Unspecified sections keep their defaults
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.dispatch.poll_interval_secs, 5);
    assert_eq!(config.dispatch.default_timeout_secs, 300);
    assert!(config.profile_backends("black").is_some());
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write bad config");

    let result = PentaflowConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_profile_with_unknown_backend() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("pentaflow.toml");
    fs::write(
        &config_path,
        r#"
[profiles]
quick = ["nmap", "masscan"]
"#,
    )
    .expect("should write config");

    let err = PentaflowConfig::load(&config_path)
        .await
        .expect_err("unknown backend in a profile must be rejected");
    let msg = err.to_string();
    assert!(msg.contains("profiles.quick"), "{msg}");
    assert!(msg.contains("masscan"), "{msg}");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let config_path = PathBuf::from("/nonexistent/pentaflow.toml");
    let result = PentaflowConfig::load(&config_path).await;
    assert!(result.is_err(), "missing file should fail strict validation");
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_show_missing_file_uses_defaults() {
    let config = PentaflowConfig::load_or_default("/nonexistent/pentaflow.toml")
        .await
        .expect("missing file should fall back to defaults");
    assert_eq!(config.store.backend, "memory");
    assert_eq!(config.tunnel.program, "openvpn");
}

#[tokio::test]
#[serial_test::serial]
async fn test_config_show_reflects_env_override() {
    // SAFETY: env mutation is serialized by serial_test.
    unsafe {
        std::env::set_var("PENTAFLOW_STORE_BACKEND", "redis");
        std::env::set_var("PENTAFLOW_STORE_REDIS_URL", "redis://:secret@cache:6379/0");
    }

    let result = PentaflowConfig::load_or_default("/nonexistent/pentaflow.toml").await;

    // SAFETY: same as above.
    unsafe {
        std::env::remove_var("PENTAFLOW_STORE_BACKEND");
        std::env::remove_var("PENTAFLOW_STORE_REDIS_URL");
    }

    let config = result.expect("env overrides should validate");
    assert_eq!(config.store.backend, "redis");
    assert_eq!(config.store.redis_url, "redis://:secret@cache:6379/0");
}
