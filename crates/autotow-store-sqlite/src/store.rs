// crates/autotow-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite AutoTow Store
// Description: Durable record, credential, and console store backed by SQLite.
// Purpose: Persist experiment records and accounts with transactional writes.
// Dependencies: autotow-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements the `autotow-core` store interfaces over one
//! `SQLite` database holding two tables, `experiment` and `user`, plus a
//! `store_meta` version row. Inserts that trip a uniqueness constraint are
//! reported as [`InsertOutcome::Duplicate`], not as failures. Console reads
//! run inside a transaction that is always rolled back; console writes commit
//! only when the statement succeeds, and any rows they yield are discarded.
//! Security posture: database contents are untrusted; rows that fail to map
//! back to domain types surface as corruption errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use autotow_core::Account;
use autotow_core::CellValue;
use autotow_core::CredentialStore;
use autotow_core::DEFAULT_STATUS;
use autotow_core::ExperimentRecord;
use autotow_core::ExternalId;
use autotow_core::InsertOutcome;
use autotow_core::NewExperiment;
use autotow_core::RecordStore;
use autotow_core::ResultTable;
use autotow_core::Role;
use autotow_core::SqlConsole;
use autotow_core::StoreAdmin;
use autotow_core::StoreError;
use autotow_core::Username;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Table definitions shared by first-run initialization and reset.
const TABLES_SQL: &str = "CREATE TABLE IF NOT EXISTS experiment (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        batch_id TEXT,
        operator TEXT,
        material TEXT,
        date TEXT,
        avg_speed REAL NOT NULL DEFAULT 0,
        avg_temp REAL NOT NULL DEFAULT 0,
        total_length REAL NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'COMPLETED',
        logs TEXT,
        created_at_ms INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS user (
        username TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL
    );";

/// Column list used by every record read.
const RECORD_COLUMNS: &str = "id, uuid, batch_id, operator, material, date, avg_speed, avg_temp, \
                              total_length, status, logs, created_at_ms";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
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

impl SqliteStoreConfig {
    /// Builds a config for `path` with default pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages never embed password hashes or record payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be mapped back to a domain value.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps an engine error into the store taxonomy.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Returns true when `err` is a uniqueness or key constraint violation.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation)
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed AutoTow store.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - Every mutation runs in its own transaction and commits only on success.
#[derive(Clone)]
pub struct SqliteStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if needed) an `SQLite`-backed store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized, or when an existing database carries an unknown schema
    /// version.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.query_row("SELECT 1", [], |_| Ok(())).map_err(db_error)
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on engine failure.
    pub fn record_count(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row("SELECT COUNT(*) FROM experiment", [], |row| row.get(0))
            .map_err(db_error)?;
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))
    }

    /// Acquires the connection lock.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Inserts a record inside a transaction.
    fn insert_record(&self, record: &NewExperiment) -> Result<InsertOutcome, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let result = tx.execute(
            "INSERT INTO experiment (uuid, batch_id, operator, material, date, avg_speed, \
             avg_temp, total_length, status, logs, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.external_id.as_str(),
                record.batch_id,
                record.operator,
                record.material,
                record.date,
                record.avg_speed,
                record.avg_temp,
                record.total_length,
                record.status,
                record.logs,
                record.created_at_ms,
            ],
        );
        match result {
            Ok(_) => {
                tx.commit().map_err(db_error)?;
                Ok(InsertOutcome::Created)
            }
            Err(err) if is_constraint_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(db_error(err)),
        }
    }

    /// Loads one record by public identifier.
    fn load_record(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ExperimentRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM experiment WHERE uuid = ?1"),
                params![external_id.as_str()],
                map_record_row,
            )
            .optional()
            .map_err(db_error)?;
        Ok(row.map(RecordRow::into_record))
    }

    /// Loads every record, newest first.
    fn load_records(&self) -> Result<Vec<ExperimentRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM experiment ORDER BY id DESC"))
            .map_err(db_error)?;
        let rows = stmt.query_map([], map_record_row).map_err(db_error)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_error)?.into_record());
        }
        Ok(records)
    }

    /// Loads one account by username.
    fn load_account(&self, username: &Username) -> Result<Option<Account>, SqliteStoreError> {
        let guard = self.lock()?;
        let row: Option<(String, String, String)> = guard
            .query_row(
                "SELECT username, password_hash, role FROM user WHERE username = ?1",
                params![username.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(db_error)?;
        row.map(|(username, password_hash, role)| account_from_row(&username, password_hash, &role))
            .transpose()
    }

    /// Inserts an account inside a transaction.
    fn store_account(&self, account: &Account) -> Result<InsertOutcome, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        match insert_account_row(&tx, account) {
            Ok(()) => {
                tx.commit().map_err(db_error)?;
                Ok(InsertOutcome::Created)
            }
            Err(err) if is_constraint_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(db_error(err)),
        }
    }

    /// Counts accounts.
    fn count_accounts(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 =
            guard.query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0)).map_err(db_error)?;
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative row count".to_string()))
    }

    /// Runs a read statement in a transaction that is always rolled back.
    fn read_statement(&self, sql: &str) -> Result<ResultTable, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let table = {
            let mut stmt = tx.prepare(sql).map_err(db_error)?;
            let columns: Vec<String> =
                stmt.column_names().into_iter().map(str::to_string).collect();
            let width = columns.len();
            let mut rows = stmt.query([]).map_err(db_error)?;
            let mut table = ResultTable {
                columns,
                rows: Vec::new(),
            };
            while let Some(row) = rows.next().map_err(db_error)? {
                let mut cells = Vec::with_capacity(width);
                for index in 0 .. width {
                    cells.push(cell_value(row.get_ref(index).map_err(db_error)?));
                }
                table.rows.push(cells);
            }
            table
        };
        tx.rollback().map_err(db_error)?;
        Ok(table)
    }

    /// Runs a write statement and commits it on success.
    ///
    /// Rows produced by the statement are discarded. The affected count is
    /// the change-counter delta, so schema statements report zero.
    fn write_statement(&self, sql: &str) -> Result<u64, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let before = tx.total_changes();
        {
            let mut stmt = tx.prepare(sql).map_err(db_error)?;
            let mut rows = stmt.query([]).map_err(db_error)?;
            while rows.next().map_err(db_error)?.is_some() {}
        }
        let affected = tx.total_changes().saturating_sub(before);
        tx.commit().map_err(db_error)?;
        Ok(affected)
    }

    /// Drops and recreates both tables, then seeds one account.
    fn reset_tables(&self, seed: &Account) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        tx.execute_batch("DROP TABLE IF EXISTS experiment; DROP TABLE IF EXISTS user;")
            .map_err(db_error)?;
        tx.execute_batch(TABLES_SQL).map_err(db_error)?;
        insert_account_row(&tx, seed).map_err(db_error)?;
        tx.commit().map_err(db_error)
    }
}

// ============================================================================
// SECTION: Interface Implementations
// ============================================================================

impl RecordStore for SqliteStore {
    fn insert_if_absent(&self, record: &NewExperiment) -> Result<InsertOutcome, StoreError> {
        self.insert_record(record).map_err(StoreError::from)
    }

    fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ExperimentRecord>, StoreError> {
        self.load_record(external_id).map_err(StoreError::from)
    }

    fn list_records(&self) -> Result<Vec<ExperimentRecord>, StoreError> {
        self.load_records().map_err(StoreError::from)
    }
}

impl CredentialStore for SqliteStore {
    fn find_account(&self, username: &Username) -> Result<Option<Account>, StoreError> {
        self.load_account(username).map_err(StoreError::from)
    }

    fn insert_account(&self, account: &Account) -> Result<InsertOutcome, StoreError> {
        self.store_account(account).map_err(StoreError::from)
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        self.count_accounts().map_err(StoreError::from)
    }
}

impl SqlConsole for SqliteStore {
    fn run_read(&self, sql: &str) -> Result<ResultTable, StoreError> {
        self.read_statement(sql).map_err(StoreError::from)
    }

    fn run_write(&self, sql: &str) -> Result<u64, StoreError> {
        self.write_statement(sql).map_err(StoreError::from)
    }
}

impl StoreAdmin for SqliteStore {
    fn reset(&self, seed: &Account) -> Result<(), StoreError> {
        self.reset_tables(seed).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw `experiment` row.
struct RecordRow {
    /// Surrogate key.
    id: i64,
    /// Public identifier.
    uuid: String,
    /// Batch name.
    batch_id: Option<String>,
    /// Operator name.
    operator: Option<String>,
    /// Material code.
    material: Option<String>,
    /// Production date.
    date: Option<String>,
    /// Average speed; `NULL` if edited through the console.
    avg_speed: Option<f64>,
    /// Average temperature.
    avg_temp: Option<f64>,
    /// Total length.
    total_length: Option<f64>,
    /// Run status.
    status: Option<String>,
    /// Log blob.
    logs: Option<String>,
    /// Receipt time.
    created_at_ms: Option<i64>,
}

impl RecordRow {
    /// Converts the raw row into the domain record, filling defaults.
    fn into_record(self) -> ExperimentRecord {
        ExperimentRecord {
            id: self.id,
            external_id: ExternalId::from_trusted(self.uuid),
            batch_id: self.batch_id,
            operator: self.operator,
            material: self.material,
            date: self.date,
            avg_speed: self.avg_speed.unwrap_or_default(),
            avg_temp: self.avg_temp.unwrap_or_default(),
            total_length: self.total_length.unwrap_or_default(),
            status: self.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            logs: self.logs,
            created_at_ms: self.created_at_ms.unwrap_or_default(),
        }
    }
}

/// Reads an `experiment` row in [`RECORD_COLUMNS`] order.
fn map_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        batch_id: row.get(2)?,
        operator: row.get(3)?,
        material: row.get(4)?,
        date: row.get(5)?,
        avg_speed: row.get(6)?,
        avg_temp: row.get(7)?,
        total_length: row.get(8)?,
        status: row.get(9)?,
        logs: row.get(10)?,
        created_at_ms: row.get(11)?,
    })
}

/// Builds an account from stored columns.
fn account_from_row(
    username: &str,
    password_hash: String,
    role: &str,
) -> Result<Account, SqliteStoreError> {
    let username = Username::parse(username)
        .map_err(|rejection| SqliteStoreError::Corrupt(format!("stored username: {rejection}")))?;
    let role = Role::from_str(role).map_err(SqliteStoreError::Corrupt)?;
    Ok(Account {
        username,
        password_hash,
        role,
    })
}

/// Inserts one account row.
fn insert_account_row(tx: &Transaction<'_>, account: &Account) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO user (username, password_hash, role) VALUES (?1, ?2, ?3)",
        params![account.username.as_str(), account.password_hash, account.role.as_str()],
    )?;
    Ok(())
}

/// Converts a borrowed `SQLite` value into a result cell.
fn cell_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(value) => CellValue::Integer(value),
        ValueRef::Real(value) => CellValue::Real(value),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version {other} (expected {SCHEMA_VERSION})"
            )));
        }
    }
    tx.execute_batch(TABLES_SQL).map_err(db_error)?;
    tx.commit().map_err(db_error)
}
