// crates/autotow-core/src/core/mod.rs
// ============================================================================
// Module: AutoTow Core Types
// Description: Domain model for records, accounts, queries, and reports.
// Purpose: Group the pure data types shared by every AutoTow crate.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Pure data types with no I/O. Validation of untrusted input happens in the
//! constructors here so that runtime services only ever see well-formed
//! values.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod account;
pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod query;
pub mod record;
pub mod report;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use account::Account;
pub use account::NewAccountRequest;
pub use account::Principal;
pub use account::Role;
pub use error::ServiceError;
pub use identifiers::ExternalId;
pub use identifiers::IdRejection;
pub use identifiers::Username;
pub use query::CellValue;
pub use query::QueryFailureKind;
pub use query::QueryOutcome;
pub use query::ResultTable;
pub use query::StatementKind;
pub use query::is_destructive;
pub use query::touches_credentials;
pub use record::DEFAULT_STATUS;
pub use record::ExperimentRecord;
pub use record::IngestPayload;
pub use record::NewExperiment;
pub use report::ReportView;
pub use report::StatusTone;
