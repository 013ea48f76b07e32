// crates/autotow-store-sqlite/src/lib.rs
// ============================================================================
// Module: AutoTow SQLite Store
// Description: SQLite backend for records, accounts, and the SQL console.
// Purpose: Provide the durable store behind the AutoTow server and CLI.
// Dependencies: autotow-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteStore`] implements every store interface from `autotow-core` over a
//! single mutex-guarded connection. Each write runs in its own transaction.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
