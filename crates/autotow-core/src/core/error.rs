// crates/autotow-core/src/core/error.rs
// ============================================================================
// Module: AutoTow Service Errors
// Description: Failure taxonomy shared by ingestion, auth, query, and reports.
// Purpose: Give the HTTP boundary one error type to map onto responses.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every runtime service fails with [`ServiceError`]. Store faults are wrapped
//! rather than propagated raw so the boundary can always render a structured
//! response.

use thiserror::Error;

use crate::interfaces::StoreError;

/// Failure outcomes of AutoTow core operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or empty input.
    #[error("validation error: {0}")]
    Validation(String),
    /// No session principal was presented.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Username or password did not match. Deliberately uninformative.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The principal's role does not permit the action.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// A uniqueness constraint rejected the write.
    #[error("already exists: {0}")]
    DuplicateKey(String),
    /// No record exists for the identifier.
    #[error("not found: {0}")]
    NotFound(String),
    /// Underlying persistence fault.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden(_) => "forbidden",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
        }
    }
}
