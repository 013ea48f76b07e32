// crates/autotow-server/tests/server_startup.rs
// ============================================================================
// Module: Server Startup Tests
// Description: Public construction paths of the AutoTow server.
// Purpose: Ensure startup bootstraps the store and honors audit settings.
// Dependencies: autotow-server, autotow-config, tempfile
// ============================================================================

//! ## Overview
//! Builds servers through the public constructors against temporary stores
//! and inspects the audit file each one writes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;

use autotow_config::AutotowConfig;
use autotow_server::AutotowServer;
use autotow_server::ServerError;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AutotowConfig {
    let mut config = AutotowConfig::default();
    config.store.path = dir.path().join("autotow.sqlite").display().to_string();
    config.auth.bootstrap_password = "startup-password".to_string();
    config
}

#[test]
fn file_audit_sink_records_startup() {
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut config = config_in(&dir);
    config.audit.path = Some(audit_path.display().to_string());

    let server = AutotowServer::from_config(config).unwrap();
    assert_eq!(server.store().record_count().unwrap(), 0);
    let _router = server.router();

    let contents = fs::read_to_string(&audit_path).unwrap();
    let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(first["event"], "startup");
    assert_eq!(first["outcome"], "bootstrap_created");
    assert_eq!(first["subject"], "admin");
    assert!(!contents.contains("startup-password"));
}

#[test]
fn disabled_audit_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let mut config = config_in(&dir);
    config.audit.enabled = false;
    config.audit.path = Some(audit_path.display().to_string());

    AutotowServer::from_config(config).unwrap();
    assert!(!audit_path.exists());
}

#[test]
fn unopenable_store_is_an_init_error() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.store.path = dir.path().display().to_string();
    config.audit.enabled = false;
    match AutotowServer::from_config(config) {
        Err(ServerError::Init(_)) => {}
        Err(other) => panic!("expected init error, got {other}"),
        Ok(_) => panic!("expected init error"),
    }
}
