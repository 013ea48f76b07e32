// crates/autotow-core/src/runtime/store.rs
// ============================================================================
// Module: AutoTow In-Memory Stores
// Description: Simple in-memory record and credential stores.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! In-memory implementations of [`RecordStore`] and [`CredentialStore`] for
//! tests and local demos. They are not intended for production use and do
//! not support the raw SQL console.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Account;
use crate::core::ExperimentRecord;
use crate::core::ExternalId;
use crate::core::NewExperiment;
use crate::core::Username;
use crate::interfaces::CredentialStore;
use crate::interfaces::InsertOutcome;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Record table contents.
#[derive(Debug, Default)]
struct RecordTable {
    /// Rows keyed by external identifier.
    rows: BTreeMap<ExternalId, ExperimentRecord>,
    /// Last assigned surrogate key.
    last_id: i64,
}

/// In-memory record store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    /// Table protected by a mutex.
    table: Arc<Mutex<RecordTable>>,
}

impl InMemoryRecordStore {
    /// Creates an empty record store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the mutex is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.rows.len())
    }

    /// Locks the table.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RecordTable>, StoreError> {
        self.table
            .lock()
            .map_err(|_| StoreError::Store("record store mutex poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_if_absent(&self, record: &NewExperiment) -> Result<InsertOutcome, StoreError> {
        let mut table = self.lock()?;
        if table.rows.contains_key(&record.external_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        table.last_id += 1;
        let stored = ExperimentRecord {
            id: table.last_id,
            external_id: record.external_id.clone(),
            batch_id: record.batch_id.clone(),
            operator: record.operator.clone(),
            material: record.material.clone(),
            date: record.date.clone(),
            avg_speed: record.avg_speed,
            avg_temp: record.avg_temp,
            total_length: record.total_length,
            status: record.status.clone(),
            logs: record.logs.clone(),
            created_at_ms: record.created_at_ms,
        };
        table.rows.insert(record.external_id.clone(), stored);
        Ok(InsertOutcome::Created)
    }

    fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<ExperimentRecord>, StoreError> {
        Ok(self.lock()?.rows.get(external_id).cloned())
    }

    fn list_records(&self) -> Result<Vec<ExperimentRecord>, StoreError> {
        let mut records: Vec<ExperimentRecord> = self.lock()?.rows.values().cloned().collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }
}

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// In-memory credential store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    /// Accounts keyed by username.
    accounts: Arc<Mutex<BTreeMap<Username, Account>>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty credential store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_account(&self, username: &Username) -> Result<Option<Account>, StoreError> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("credential store mutex poisoned".to_string()))?;
        Ok(accounts.get(username).cloned())
    }

    fn insert_account(&self, account: &Account) -> Result<InsertOutcome, StoreError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("credential store mutex poisoned".to_string()))?;
        if accounts.contains_key(&account.username) {
            return Ok(InsertOutcome::Duplicate);
        }
        accounts.insert(account.username.clone(), account.clone());
        Ok(InsertOutcome::Created)
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| StoreError::Store("credential store mutex poisoned".to_string()))?;
        Ok(u64::try_from(accounts.len()).unwrap_or(u64::MAX))
    }
}
