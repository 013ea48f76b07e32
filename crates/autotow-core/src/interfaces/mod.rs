// crates/autotow-core/src/interfaces/mod.rs
// ============================================================================
// Module: AutoTow Interfaces
// Description: Backend-agnostic persistence interfaces.
// Purpose: Define the seams between runtime services and storage backends.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Runtime services depend only on these traits. Every write-bearing method
//! is a single transaction in the backend: it either commits fully or leaves
//! no trace. Uniqueness conflicts are reported as [`InsertOutcome::Duplicate`]
//! rather than as errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Account;
use crate::core::ExperimentRecord;
use crate::core::ExternalId;
use crate::core::NewExperiment;
use crate::core::ResultTable;
use crate::core::Username;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Backend engine error.
    #[error("store error: {0}")]
    Store(String),
    /// Stored data failed an integrity check.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Schema version not understood by this build.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid data presented to or read from the store.
    #[error("store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of an insert guarded by a uniqueness key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Created,
    /// The key already existed; nothing was written.
    Duplicate,
}

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Durable experiment record table.
pub trait RecordStore: Send + Sync {
    /// Inserts the record unless its external identifier already exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure; the transaction is
    /// rolled back.
    fn insert_if_absent(&self, record: &NewExperiment) -> Result<InsertOutcome, StoreError>;

    /// Loads a record by external identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ExperimentRecord>, StoreError>;

    /// Lists every record, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn list_records(&self) -> Result<Vec<ExperimentRecord>, StoreError>;
}

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// Durable account table.
pub trait CredentialStore: Send + Sync {
    /// Loads an account by exact username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn find_account(&self, username: &Username) -> Result<Option<Account>, StoreError>;

    /// Inserts the account unless the username already exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn insert_account(&self, account: &Account) -> Result<InsertOutcome, StoreError>;

    /// Returns the number of accounts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn account_count(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: SQL Console
// ============================================================================

/// Raw statement execution against the record store.
pub trait SqlConsole: Send + Sync {
    /// Executes a read statement and rolls back whatever it touched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] carrying the backend's message.
    fn run_read(&self, sql: &str) -> Result<ResultTable, StoreError>;

    /// Executes a write statement and commits it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] carrying the backend's message; nothing is
    /// committed.
    fn run_write(&self, sql: &str) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Store Administration
// ============================================================================

/// Destructive maintenance operations.
pub trait StoreAdmin: Send + Sync {
    /// Drops and recreates every table, then inserts `seed` as the only
    /// account. Runs as one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure; the previous contents
    /// survive intact.
    fn reset(&self, seed: &Account) -> Result<(), StoreError>;
}
