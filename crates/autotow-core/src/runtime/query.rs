// crates/autotow-core/src/runtime/query.rs
// ============================================================================
// Module: AutoTow Query Executor
// Description: Role-gated ad-hoc statement execution for the dashboard console.
// Purpose: Run operator-supplied SQL without letting faults escape.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The console is an admin power tool that executes raw statement text. The
//! executor never runs a destructive statement for a non-admin principal,
//! never lets a non-admin reach the `user` table, never commits a read, and turns every backend fault into an
//! [`QueryOutcome::Error`] so the dashboard request always completes.
//! Callers must hold a session principal; the type signature enforces it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::Principal;
use crate::core::QueryFailureKind;
use crate::core::QueryOutcome;
use crate::core::StatementKind;
use crate::core::is_destructive;
use crate::core::touches_credentials;
use crate::interfaces::SqlConsole;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum statement size in bytes.
pub const DEFAULT_MAX_QUERY_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Ad-hoc query executor.
#[derive(Clone)]
pub struct QueryExecutor {
    /// Raw statement backend.
    console: Arc<dyn SqlConsole>,
    /// Maximum statement size in bytes.
    max_query_bytes: usize,
}

impl QueryExecutor {
    /// Builds an executor with the default statement size limit.
    #[must_use]
    pub fn new(console: Arc<dyn SqlConsole>) -> Self {
        Self::with_limit(console, DEFAULT_MAX_QUERY_BYTES)
    }

    /// Builds an executor with an explicit statement size limit.
    #[must_use]
    pub fn with_limit(console: Arc<dyn SqlConsole>, max_query_bytes: usize) -> Self {
        Self {
            console,
            max_query_bytes,
        }
    }

    /// Runs a console statement on behalf of `principal`.
    #[must_use]
    pub fn run_query(&self, principal: &Principal, text: &str) -> QueryOutcome {
        let statement = text.trim();
        if statement.is_empty() {
            return QueryOutcome::error(QueryFailureKind::Validation, "query text is empty");
        }
        if statement.len() > self.max_query_bytes {
            return QueryOutcome::error(
                QueryFailureKind::Validation,
                format!("query exceeds {} bytes", self.max_query_bytes),
            );
        }
        if is_destructive(statement) && !principal.is_admin() {
            return QueryOutcome::error(
                QueryFailureKind::Forbidden,
                "DELETE and DROP statements require the admin role",
            );
        }
        if touches_credentials(statement) && !principal.is_admin() {
            return QueryOutcome::error(
                QueryFailureKind::Forbidden,
                "statements on the user table require the admin role",
            );
        }
        let result = match StatementKind::classify(statement) {
            StatementKind::Read => self.console.run_read(statement).map(QueryOutcome::from),
            StatementKind::Write => self.console.run_write(statement).map(|affected| {
                QueryOutcome::Mutation {
                    affected,
                }
            }),
        };
        result.unwrap_or_else(|err| QueryOutcome::error(QueryFailureKind::Store, err.to_string()))
    }
}
