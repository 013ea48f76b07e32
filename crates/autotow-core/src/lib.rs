// crates/autotow-core/src/lib.rs
// ============================================================================
// Module: AutoTow Core Library
// Description: Public API surface for the AutoTow records core.
// Purpose: Expose domain types, store interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! AutoTow core owns the ingestion-and-query layer of the production records
//! service: idempotent record upload, credential-gated sessions, role-scoped
//! ad-hoc query execution, and report projection. It is storage-agnostic and
//! talks to persistence only through the traits in [`interfaces`]; the HTTP
//! boundary and the `SQLite` backend live in sibling crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CredentialStore;
pub use interfaces::InsertOutcome;
pub use interfaces::RecordStore;
pub use interfaces::SqlConsole;
pub use interfaces::StoreAdmin;
pub use interfaces::StoreError;
pub use runtime::Authenticator;
pub use runtime::DEFAULT_MAX_SESSIONS;
pub use runtime::DEFAULT_SESSION_TTL;
pub use runtime::IdGenerator;
pub use runtime::InMemoryCredentialStore;
pub use runtime::InMemoryRecordStore;
pub use runtime::IngestReceipt;
pub use runtime::IngestStatus;
pub use runtime::IngestionService;
pub use runtime::MAX_ID_ATTEMPTS;
pub use runtime::QueryExecutor;
pub use runtime::RandomIdGenerator;
pub use runtime::ReportRenderer;
pub use runtime::SessionRegistry;
pub use runtime::build_account;
