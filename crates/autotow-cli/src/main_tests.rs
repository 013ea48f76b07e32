// crates/autotow-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and offline store commands.
// Purpose: Ensure destructive commands require confirmation and fail closed.
// Dependencies: autotow-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Exercises clap parsing and the store-administration commands against a
//! temporary database selected through an explicit config file.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use autotow_core::Authenticator;
use autotow_core::Role;
use autotow_core::ServiceError;
use clap::Parser;
use tempfile::TempDir;

use super::Cli;
use super::Commands;
use super::ConfigArgs;
use super::ConfigCommand;
use super::CreateUserCommand;
use super::ResetDbCommand;
use super::RoleArg;
use super::command_config_check;
use super::command_create_user;
use super::command_reset_db;
use super::load_config;
use super::open_store;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn write_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("autotow.toml");
    let db = dir.path().join("records.sqlite");
    let contents = format!(
        "[store]\npath = \"{}\"\n\n[auth]\nbootstrap_password = \"cli-admin-password\"\n",
        db.display().to_string().replace('\\', "/")
    );
    fs::write(&path, contents).unwrap();
    path
}

fn config_args(path: &Path) -> ConfigArgs {
    ConfigArgs {
        config: Some(path.to_path_buf()),
    }
}

fn create_user(path: &Path, username: &str, role: RoleArg) -> Result<(), String> {
    command_create_user(&CreateUserCommand {
        config: config_args(path),
        username: username.to_string(),
        password: "secret-password".to_string(),
        role,
    })
    .map(|_| ())
    .map_err(|err| err.to_string())
}

fn authenticator(path: &Path) -> Authenticator {
    let config = load_config(&config_args(path)).unwrap();
    Authenticator::new(Arc::new(open_store(&config).unwrap()))
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn parses_create_user_with_default_role() {
    let cli = Cli::try_parse_from([
        "autotow",
        "create-user",
        "--username",
        "op",
        "--password",
        "pw",
    ])
    .unwrap();
    let Commands::CreateUser(command) = cli.command else {
        panic!("expected create-user");
    };
    assert_eq!(command.role, RoleArg::Operator);
    assert!(command.config.config.is_none());
}

#[test]
fn parses_nested_config_check() {
    let cli = Cli::try_parse_from(["autotow", "config", "check", "--config", "x.toml"]).unwrap();
    let Commands::Config {
        command: ConfigCommand::Check(args),
    } = cli.command
    else {
        panic!("expected config check");
    };
    assert_eq!(args.config, Some(PathBuf::from("x.toml")));
}

#[test]
fn rejects_unknown_role() {
    let result = Cli::try_parse_from([
        "autotow",
        "create-user",
        "--username",
        "op",
        "--password",
        "pw",
        "--role",
        "root",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

#[test]
fn reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);
    let err = command_reset_db(&ResetDbCommand {
        config: config_args(&path),
        yes: false,
    })
    .unwrap_err();
    assert!(err.to_string().contains("--yes"));
    assert!(!dir.path().join("records.sqlite").exists());
}

#[test]
fn create_user_registers_and_rejects_duplicates() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);
    create_user(&path, "alice", RoleArg::Admin).unwrap();
    let err = create_user(&path, "alice", RoleArg::Operator).unwrap_err();
    assert!(err.contains("already exists"));

    let principal = authenticator(&path).login("alice", "secret-password").unwrap();
    assert_eq!(principal.role, Role::Admin);
}

#[test]
fn reset_reseeds_only_the_bootstrap_admin() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);
    create_user(&path, "bob", RoleArg::Operator).unwrap();
    command_reset_db(&ResetDbCommand {
        config: config_args(&path),
        yes: true,
    })
    .unwrap();

    let auth = authenticator(&path);
    assert!(matches!(
        auth.login("bob", "secret-password").unwrap_err(),
        ServiceError::InvalidCredentials
    ));
    let admin = auth.login("admin", "cli-admin-password").unwrap();
    assert_eq!(admin.role, Role::Admin);
}

#[test]
fn config_check_reports_invalid_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("autotow.toml");
    fs::write(&path, "[server]\nbind = \"not-an-address\"\n").unwrap();
    let err = command_config_check(&config_args(&path)).unwrap_err();
    assert!(err.to_string().contains("failed to load config"));

    let valid = write_config(&dir);
    assert!(command_config_check(&config_args(&valid)).is_ok());
}
