// crates/autotow-config/src/config.rs
// ============================================================================
// Module: AutoTow Configuration
// Description: Configuration loading and validation for AutoTow.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: autotow-core, autotow-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then selected fields are overridden from `AUTOTOW_*` environment
//! variables. A missing file is only tolerated when no path was requested
//! explicitly; in that case every section takes its defaults.
//! Security posture: config inputs are untrusted and validation fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use autotow_core::Username;
use autotow_core::runtime::auth::MAX_PASSWORD_BYTES;
use autotow_store_sqlite::SqliteStoreConfig;
use autotow_store_sqlite::SqliteStoreMode;
use autotow_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "autotow.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "AUTOTOW_CONFIG";
/// Environment variable overriding `store.path`.
pub const DATABASE_PATH_ENV_VAR: &str = "AUTOTOW_DATABASE_PATH";
/// Environment variable overriding `auth.secret_key`.
pub const SECRET_KEY_ENV_VAR: &str = "AUTOTOW_SECRET_KEY";
/// Environment variable overriding `server.bind`.
pub const BIND_ENV_VAR: &str = "AUTOTOW_BIND";
/// Environment variable overriding `auth.bootstrap_password`.
pub const ADMIN_PASSWORD_ENV_VAR: &str = "AUTOTOW_ADMIN_PASSWORD";

/// Default database file.
pub const DEFAULT_DATABASE_PATH: &str = "autotow.sqlite";
/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:5001";
/// Default bootstrap admin username.
pub const DEFAULT_BOOTSTRAP_USERNAME: &str = "admin";
/// Built-in bootstrap admin password; using it triggers a startup warning.
pub const DEFAULT_BOOTSTRAP_PASSWORD: &str = "changeme";

/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default request body limit in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Hard upper bound for the request body limit.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default busy timeout (ms).
pub(crate) const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum busy timeout (ms).
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Default console statement limit in bytes.
pub(crate) const DEFAULT_MAX_QUERY_BYTES: usize = autotow_core::runtime::DEFAULT_MAX_QUERY_BYTES;
/// Hard upper bound for the console statement limit.
pub(crate) const MAX_QUERY_BYTES_LIMIT: usize = 1024 * 1024;
/// Minimum secret key length in bytes.
pub(crate) const MIN_SECRET_KEY_BYTES: usize = 16;
/// Maximum secret key length in bytes.
pub(crate) const MAX_SECRET_KEY_BYTES: usize = 1024;
/// Upper bound for the session lifetime (seconds).
pub(crate) const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Upper bound for the live session cap.
pub(crate) const MAX_SESSIONS_LIMIT: usize = 100_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// AutoTow service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutotowConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Session and bootstrap account configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Query console configuration.
    #[serde(default)]
    pub query: QueryConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// File the configuration was read from, if any (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl AutotowConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// Loads configuration, resolving environment variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicitly requested file is missing,
    /// the file is unreadable or malformed, or validation fails.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (resolved, explicit) = resolve_path(path, &lookup)?;
        validate_path(&resolved)?;
        let mut config = if !explicit && !resolved.exists() {
            Self::default()
        } else {
            let mut config = Self::from_file(&resolved)?;
            config.source_path = Some(resolved);
            config
        };
        config.apply_env_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without applying overrides or validation.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies `AUTOTOW_*` overrides resolved through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DATABASE_PATH_ENV_VAR) {
            self.store.path = path;
        }
        if let Some(secret) = lookup(SECRET_KEY_ENV_VAR) {
            self.auth.secret_key = Some(secret);
        }
        if let Some(bind) = lookup(BIND_ENV_VAR) {
            self.server.bind = bind;
        }
        if let Some(password) = lookup(ADMIN_PASSWORD_ENV_VAR) {
            self.auth.bootstrap_password = password;
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.auth.validate()?;
        self.query.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `server.bind` is not a socket
    /// address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind_addr()
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: PathBuf::from(self.store.path.trim()),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
        }
    }

    /// Returns the configured session lifetime.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_ttl_secs)
    }

    /// Returns true when the bootstrap password is the built-in default.
    #[must_use]
    pub fn uses_default_bootstrap_password(&self) -> bool {
        self.auth.bootstrap_password == DEFAULT_BOOTSTRAP_PASSWORD
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address (`host:port`).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Parses the listen address.
    fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub path: String,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates database configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path)?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Session and bootstrap account configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Secret mixed into session cookie tags. Generated per process when
    /// unset, which invalidates sessions on restart.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Username of the admin account created on first start.
    #[serde(default = "default_bootstrap_username")]
    pub bootstrap_username: String,
    /// Password of the admin account created on first start.
    #[serde(default = "default_bootstrap_password")]
    pub bootstrap_password: String,
    /// Marks the session cookie `Secure`.
    #[serde(default)]
    pub cookie_secure: bool,
    /// Session lifetime after login, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Maximum live sessions; the oldest is evicted beyond this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            bootstrap_username: default_bootstrap_username(),
            bootstrap_password: default_bootstrap_password(),
            cookie_secure: false,
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl AuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.secret_key {
            if secret.trim().is_empty() {
                return Err(ConfigError::Invalid("auth.secret_key must be non-empty".to_string()));
            }
            if secret.len() < MIN_SECRET_KEY_BYTES {
                return Err(ConfigError::Invalid(format!(
                    "auth.secret_key must be at least {MIN_SECRET_KEY_BYTES} bytes"
                )));
            }
            if secret.len() > MAX_SECRET_KEY_BYTES {
                return Err(ConfigError::Invalid("auth.secret_key exceeds max length".to_string()));
            }
        }
        Username::parse(&self.bootstrap_username).map_err(|rejection| {
            ConfigError::Invalid(format!("auth.bootstrap_username is invalid: {rejection}"))
        })?;
        if self.bootstrap_password.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.bootstrap_password must be non-empty".to_string(),
            ));
        }
        if self.bootstrap_password.len() > MAX_PASSWORD_BYTES {
            return Err(ConfigError::Invalid(
                "auth.bootstrap_password exceeds max length".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 || self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth.session_ttl_secs must be between 1 and {MAX_SESSION_TTL_SECS}"
            )));
        }
        if self.max_sessions == 0 || self.max_sessions > MAX_SESSIONS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "auth.max_sessions must be between 1 and {MAX_SESSIONS_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Query console configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Maximum accepted statement length in bytes.
    #[serde(default = "default_max_query_bytes")]
    pub max_query_bytes: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_bytes: default_max_query_bytes(),
        }
    }
}

impl QueryConfig {
    /// Validates query configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_query_bytes == 0 || self.max_query_bytes > MAX_QUERY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "query.max_query_bytes must be between 1 and {MAX_QUERY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// Log raw console statements instead of their hashes (explicit opt-in).
    #[serde(default)]
    pub log_query_text: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
            log_query_text: false,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default listen address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default database path.
fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default bootstrap username.
fn default_bootstrap_username() -> String {
    DEFAULT_BOOTSTRAP_USERNAME.to_string()
}

/// Returns the default bootstrap password.
fn default_bootstrap_password() -> String {
    DEFAULT_BOOTSTRAP_PASSWORD.to_string()
}

/// Returns the default session lifetime.
const fn default_session_ttl_secs() -> u64 {
    autotow_core::DEFAULT_SESSION_TTL.as_secs()
}

/// Returns the default live session cap.
const fn default_max_sessions() -> usize {
    autotow_core::DEFAULT_MAX_SESSIONS
}

/// Returns the default console statement limit.
const fn default_max_query_bytes() -> usize {
    DEFAULT_MAX_QUERY_BYTES
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// The flag is true when the path was requested explicitly.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<(PathBuf, bool), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let result = validate_path_string("test_path", "   ");
        assert!(result.unwrap_err().to_string().contains("non-empty"));
    }

    #[test]
    fn validate_path_string_rejects_overlong_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let result = validate_path_string("test_path", &format!("dir/{long}"));
        assert!(result.unwrap_err().to_string().contains("component too long"));
    }

    #[test]
    fn explicit_path_wins_over_env() {
        let (path, explicit) =
            resolve_path(Some(Path::new("cli.toml")), &|_: &str| Some("env.toml".to_string()))
                .unwrap();
        assert_eq!(path, PathBuf::from("cli.toml"));
        assert!(explicit);
    }

    #[test]
    fn default_name_is_not_explicit() {
        let (path, explicit) = resolve_path(None, &|_: &str| None).unwrap();
        assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_NAME));
        assert!(!explicit);
    }
}
