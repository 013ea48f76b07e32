// crates/autotow-core/src/runtime/mod.rs
// ============================================================================
// Module: AutoTow Runtime
// Description: Services that implement the ingestion-and-query layer.
// Purpose: Wire domain rules to the store interfaces.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Each service owns `Arc` handles to the store traits it needs and is cheap
//! to clone into request handlers.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod ingest;
pub mod query;
pub mod report;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::Authenticator;
pub use auth::DEFAULT_MAX_SESSIONS;
pub use auth::DEFAULT_SESSION_TTL;
pub use auth::SessionRegistry;
pub use auth::build_account;
pub use ingest::IdGenerator;
pub use ingest::IngestReceipt;
pub use ingest::IngestStatus;
pub use ingest::IngestionService;
pub use ingest::MAX_ID_ATTEMPTS;
pub use ingest::RandomIdGenerator;
pub use query::DEFAULT_MAX_QUERY_BYTES;
pub use query::QueryExecutor;
pub use report::ReportRenderer;
pub use store::InMemoryCredentialStore;
pub use store::InMemoryRecordStore;
