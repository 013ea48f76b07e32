//! Config loading, override, and validation tests for autotow-config.
// crates/autotow-config/tests/config_load.rs
// =============================================================================
// Module: Config Load and Validation Tests
// Description: Validate defaults, file loading, env overrides, and limits.
// Purpose: Ensure configuration fails closed on invalid input.
// =============================================================================

use std::fs;
use std::path::PathBuf;

use autotow_config::AutotowConfig;
use autotow_config::ConfigError;
use autotow_config::DEFAULT_BIND;
use autotow_config::DEFAULT_DATABASE_PATH;
use autotow_store_sqlite::SqliteStoreMode;
use autotow_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

mod common;

type TestResult = Result<(), String>;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.server.bind != DEFAULT_BIND {
        return Err(format!("unexpected default bind {}", config.server.bind));
    }
    if config.store.path != DEFAULT_DATABASE_PATH {
        return Err(format!("unexpected default store path {}", config.store.path));
    }
    if config.query.max_query_bytes != 64 * 1024 {
        return Err("query.max_query_bytes should default to 64 KiB".to_string());
    }
    if !config.audit.enabled || config.audit.log_query_text {
        return Err("audit should default to enabled and hash-only".to_string());
    }
    if !config.uses_default_bootstrap_password() {
        return Err("default bootstrap password should be detected".to_string());
    }
    Ok(())
}

#[test]
fn missing_default_file_yields_defaults() -> TestResult {
    let lookup = common::env_lookup(&[]);
    let config = AutotowConfig::load_with(None, lookup).map_err(|err| err.to_string())?;
    if config.source_path.is_some() {
        return Err("no source path expected without a file".to_string());
    }
    Ok(())
}

#[test]
fn missing_explicit_file_is_an_io_error() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match AutotowConfig::load_with(Some(&path), common::env_lookup(&[])) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(err) => Err(format!("expected io error, got {err}")),
        Ok(_) => Err("expected io error".to_string()),
    }
}

#[test]
fn missing_env_selected_file_is_an_io_error() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    let path_text = path.display().to_string();
    let lookup = common::env_lookup(&[("AUTOTOW_CONFIG", path_text.as_str())]);
    match AutotowConfig::load_with(None, lookup) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(err) => Err(format!("expected io error, got {err}")),
        Ok(_) => Err("expected io error".to_string()),
    }
}

// ============================================================================
// SECTION: File Loading
// ============================================================================

#[test]
fn file_values_are_loaded() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("autotow.toml");
    fs::write(
        &path,
        r#"
[server]
bind = "0.0.0.0:8080"
max_body_bytes = 4096

[store]
path = "data/records.sqlite"
journal_mode = "delete"
sync_mode = "normal"

[auth]
secret_key = "0123456789abcdef0123"
bootstrap_username = "root"
bootstrap_password = "s3cret"
cookie_secure = true
session_ttl_secs = 600
max_sessions = 16

[query]
max_query_bytes = 1024

[audit]
enabled = false
log_query_text = true
"#,
    )
    .map_err(|err| err.to_string())?;

    let config = AutotowConfig::load_with(Some(&path), common::env_lookup(&[]))
        .map_err(|err| err.to_string())?;
    let bind = config.bind_addr().map_err(|err| err.to_string())?;
    if bind.port() != 8080 || config.server.max_body_bytes != 4096 {
        return Err("server section not applied".to_string());
    }
    let store = config.store_config();
    if store.path != PathBuf::from("data/records.sqlite")
        || store.journal_mode != SqliteStoreMode::Delete
        || store.sync_mode != SqliteSyncMode::Normal
    {
        return Err("store section not applied".to_string());
    }
    if config.auth.bootstrap_username != "root"
        || !config.auth.cookie_secure
        || config.session_ttl().as_secs() != 600
        || config.auth.max_sessions != 16
    {
        return Err("auth section not applied".to_string());
    }
    if config.uses_default_bootstrap_password() {
        return Err("custom bootstrap password misdetected as default".to_string());
    }
    if config.query.max_query_bytes != 1024 || config.audit.enabled || !config.audit.log_query_text
    {
        return Err("query/audit sections not applied".to_string());
    }
    if config.source_path.as_deref() != Some(path.as_path()) {
        return Err("source path not recorded".to_string());
    }
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("autotow.toml");
    fs::write(&path, "[server]\nbind = \"127.0.0.1:1\"\nport = 5\n").map_err(|err| err.to_string())?;
    match AutotowConfig::load_with(Some(&path), common::env_lookup(&[])) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(err) => Err(format!("expected parse error, got {err}")),
        Ok(_) => Err("expected parse error".to_string()),
    }
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("autotow.toml");
    let padding = "#".repeat(1024 * 1024 + 1);
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    common::assert_invalid(
        AutotowConfig::load_with(Some(&path), common::env_lookup(&[])),
        "exceeds size limit",
    )
}

// ============================================================================
// SECTION: Environment Overrides
// ============================================================================

#[test]
fn env_overrides_replace_file_values() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let path = dir.path().join("autotow.toml");
    fs::write(&path, "[store]\npath = \"from-file.sqlite\"\n").map_err(|err| err.to_string())?;
    let lookup = common::env_lookup(&[
        ("AUTOTOW_DATABASE_PATH", "from-env.sqlite"),
        ("AUTOTOW_SECRET_KEY", "env-secret-key-0123456789"),
        ("AUTOTOW_BIND", "127.0.0.1:9000"),
        ("AUTOTOW_ADMIN_PASSWORD", "env-admin-password"),
    ]);
    let config = AutotowConfig::load_with(Some(&path), lookup).map_err(|err| err.to_string())?;
    if config.store.path != "from-env.sqlite" {
        return Err(format!("store.path not overridden: {}", config.store.path));
    }
    if config.auth.secret_key.as_deref() != Some("env-secret-key-0123456789") {
        return Err("secret key not overridden".to_string());
    }
    if config.server.bind != "127.0.0.1:9000" {
        return Err("bind not overridden".to_string());
    }
    if config.uses_default_bootstrap_password() {
        return Err("bootstrap password not overridden".to_string());
    }
    Ok(())
}

#[test]
fn invalid_env_override_fails_validation() -> TestResult {
    let lookup = common::env_lookup(&[("AUTOTOW_BIND", "not-an-address")]);
    common::assert_invalid(AutotowConfig::load_with(None, lookup), "invalid server.bind address")
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn empty_secret_key_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.secret_key = Some("   ".to_string());
    common::assert_invalid(config.validate(), "auth.secret_key must be non-empty")
}

#[test]
fn short_secret_key_is_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.secret_key = Some("short".to_string());
    common::assert_invalid(config.validate(), "auth.secret_key must be at least")
}

#[test]
fn bootstrap_account_must_be_usable() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.bootstrap_username = "has space".to_string();
    common::assert_invalid(config.validate(), "auth.bootstrap_username is invalid")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.bootstrap_password = String::new();
    common::assert_invalid(config.validate(), "auth.bootstrap_password must be non-empty")
}

#[test]
fn limits_are_bounded() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    common::assert_invalid(config.validate(), "server.max_body_bytes")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.query.max_query_bytes = 2 * 1024 * 1024;
    common::assert_invalid(config.validate(), "query.max_query_bytes")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.busy_timeout_ms = 120_000;
    common::assert_invalid(config.validate(), "store.busy_timeout_ms")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.session_ttl_secs = 0;
    common::assert_invalid(config.validate(), "auth.session_ttl_secs")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.auth.max_sessions = 0;
    common::assert_invalid(config.validate(), "auth.max_sessions")
}

#[test]
fn empty_paths_are_rejected() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.store.path = " ".to_string();
    common::assert_invalid(config.validate(), "store.path must be non-empty")?;

    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.audit.path = Some(String::new());
    common::assert_invalid(config.validate(), "audit.path must be non-empty")
}
