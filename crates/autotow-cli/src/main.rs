// crates/autotow-cli/src/main.rs
// ============================================================================
// Module: AutoTow CLI Entry Point
// Description: Command dispatcher for the AutoTow records service.
// Purpose: Run the HTTP server and offline store administration tasks.
// Dependencies: clap, autotow-config, autotow-core, autotow-server, tokio
// ============================================================================

//! ## Overview
//! The `autotow` binary starts the HTTP server and performs offline tasks
//! against the configured `SQLite` database: destructive reset, account
//! creation, and configuration checks. Every command resolves configuration
//! the same way the server does: `--config`, then `AUTOTOW_CONFIG`, then
//! `autotow.toml`, with environment overrides applied last.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use autotow_config::AutotowConfig;
use autotow_core::Authenticator;
use autotow_core::NewAccountRequest;
use autotow_core::Role;
use autotow_core::StoreAdmin;
use autotow_core::build_account;
use autotow_server::AutotowServer;
use autotow_store_sqlite::SqliteStore;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "autotow", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ConfigArgs),
    /// Drop and recreate all tables, reseeding the bootstrap admin.
    ResetDb(ResetDbCommand),
    /// Create an account directly in the store.
    CreateUser(CreateUserCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Shared configuration location argument.
#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// Optional config file path (defaults to autotow.toml or `AUTOTOW_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `reset-db`.
#[derive(Args, Debug)]
struct ResetDbCommand {
    /// Config location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Confirms the destructive reset.
    #[arg(long)]
    yes: bool,
}

/// Arguments for `create-user`.
#[derive(Args, Debug)]
struct CreateUserCommand {
    /// Config location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Username for the new account.
    #[arg(long)]
    username: String,
    /// Password for the new account.
    #[arg(long)]
    password: String,
    /// Role for the new account.
    #[arg(long, value_enum, default_value_t = RoleArg::Operator)]
    role: RoleArg,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration.
    Check(ConfigArgs),
}

/// Account role argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum RoleArg {
    /// Administrator.
    Admin,
    /// Operator.
    Operator,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Self::Admin,
            RoleArg::Operator => Self::Operator,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(args) => command_serve(&args).await,
        Commands::ResetDb(command) => command_reset_db(&command),
        Commands::CreateUser(command) => command_create_user(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Check(args) => command_config_check(&args),
        },
    }
}

/// Loads configuration from the CLI path or the environment.
fn load_config(args: &ConfigArgs) -> CliResult<AutotowConfig> {
    AutotowConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Opens the configured store.
fn open_store(config: &AutotowConfig) -> CliResult<SqliteStore> {
    SqliteStore::new(config.store_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let bind = config.server.bind.clone();
    let server = AutotowServer::from_config(config).map_err(|err| CliError::new(err.to_string()))?;
    write_stderr_line(&format!("autotow: listening on http://{bind}"))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `reset-db` command.
fn command_reset_db(command: &ResetDbCommand) -> CliResult<ExitCode> {
    if !command.yes {
        return Err(CliError::new(
            "reset-db drops every record and account; re-run with --yes to confirm",
        ));
    }
    let config = load_config(&command.config)?;
    let seed = build_account(NewAccountRequest {
        username: config.auth.bootstrap_username.clone(),
        password: config.auth.bootstrap_password.clone(),
        role: Some(Role::Admin),
    })
    .map_err(|err| CliError::new(format!("invalid bootstrap account: {err}")))?;
    let store = open_store(&config)?;
    store.reset(&seed).map_err(|err| CliError::new(format!("reset failed: {err}")))?;
    write_stdout_line(&format!(
        "database reset at {}; bootstrap account '{}' reseeded",
        store.path().display(),
        seed.username
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `create-user` command.
fn command_create_user(command: &CreateUserCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    let store = open_store(&config)?;
    let auth = Authenticator::new(Arc::new(store));
    let principal = auth
        .register(NewAccountRequest {
            username: command.username.clone(),
            password: command.password.clone(),
            role: Some(command.role.into()),
        })
        .map_err(|err| CliError::new(format!("create-user failed: {err}")))?;
    write_stdout_line(&format!("created {} account '{}'", principal.role, principal.username))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config check` command.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let source = config
        .source_path
        .as_ref()
        .map_or_else(|| "built-in defaults".to_string(), |path| path.display().to_string());
    write_stdout_line(&format!(
        "config ok ({source}): bind {}, store {}",
        config.server.bind, config.store.path
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    if config.uses_default_bootstrap_password() {
        write_stderr_line(
            "autotow: WARNING: bootstrap password is the built-in default; set \
             auth.bootstrap_password or AUTOTOW_ADMIN_PASSWORD",
        )
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
