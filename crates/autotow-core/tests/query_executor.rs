// crates/autotow-core/tests/query_executor.rs
// ============================================================================
// Module: Query Executor Tests
// Description: Validation, role gating, and classification of console queries.
// Purpose: Ensure forbidden statements never reach the backend.
// Dependencies: autotow-core
// ============================================================================

//! ## Overview
//! Uses a recording console double so tests can assert which backend entry
//! point (if any) each statement reached. Backend semantics are covered by
//! the `SQLite` store tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use autotow_core::CellValue;
use autotow_core::Principal;
use autotow_core::QueryExecutor;
use autotow_core::QueryFailureKind;
use autotow_core::QueryOutcome;
use autotow_core::ResultTable;
use autotow_core::Role;
use autotow_core::SqlConsole;
use autotow_core::StoreError;
use autotow_core::Username;

// ============================================================================
// SECTION: Helpers
// ============================================================================

#[derive(Default)]
struct RecordingConsole {
    calls: Mutex<Vec<(&'static str, String)>>,
    fail_with: Option<&'static str>,
}

impl RecordingConsole {
    fn failing(message: &'static str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message),
        }
    }

    fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SqlConsole for RecordingConsole {
    fn run_read(&self, sql: &str) -> Result<ResultTable, StoreError> {
        self.calls.lock().unwrap().push(("read", sql.to_string()));
        if let Some(message) = self.fail_with {
            return Err(StoreError::Store(message.to_string()));
        }
        Ok(ResultTable {
            columns: vec!["n".to_string()],
            rows: vec![vec![CellValue::Integer(1)]],
        })
    }

    fn run_write(&self, sql: &str) -> Result<u64, StoreError> {
        self.calls.lock().unwrap().push(("write", sql.to_string()));
        if let Some(message) = self.fail_with {
            return Err(StoreError::Store(message.to_string()));
        }
        Ok(3)
    }
}

fn principal(role: Role) -> Principal {
    Principal {
        username: Username::parse("tester").unwrap(),
        role,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn blank_text_is_a_validation_outcome() {
    let console = Arc::new(RecordingConsole::default());
    let executor = QueryExecutor::new(console.clone());
    for text in ["", "   ", "\n\t"] {
        let outcome = executor.run_query(&principal(Role::Admin), text);
        assert!(matches!(
            outcome,
            QueryOutcome::Error {
                kind: QueryFailureKind::Validation,
                ..
            }
        ));
    }
    assert!(console.calls().is_empty());
}

#[test]
fn oversized_text_is_rejected_before_execution() {
    let console = Arc::new(RecordingConsole::default());
    let executor = QueryExecutor::with_limit(console.clone(), 16);
    let outcome = executor.run_query(&principal(Role::Admin), "SELECT * FROM experiment");
    assert_eq!(outcome.label(), "validation");
    assert!(console.calls().is_empty());
}

#[test]
fn operator_destructive_statements_are_forbidden_without_execution() {
    let console = Arc::new(RecordingConsole::default());
    let executor = QueryExecutor::new(console.clone());
    for text in [
        "DELETE FROM experiment",
        "delete from experiment where id = 1",
        "DROP TABLE user",
        "SELECT * FROM experiment; drop table experiment",
    ] {
        let outcome = executor.run_query(&principal(Role::Operator), text);
        assert!(
            matches!(
                outcome,
                QueryOutcome::Error {
                    kind: QueryFailureKind::Forbidden,
                    ..
                }
            ),
            "{text}"
        );
    }
    assert!(console.calls().is_empty());
}

#[test]
fn admin_destructive_statement_executes_as_write() {
    let console = Arc::new(RecordingConsole::default());
    let executor = QueryExecutor::new(console.clone());
    let outcome = executor.run_query(&principal(Role::Admin), "  DELETE FROM experiment  ");
    assert_eq!(
        outcome,
        QueryOutcome::Mutation {
            affected: 3
        }
    );
    assert_eq!(console.calls(), vec![("write", "DELETE FROM experiment".to_string())]);
}

#[test]
fn select_goes_to_read_path_everything_else_to_write_path() {
    let console = Arc::new(RecordingConsole::default());
    let executor = QueryExecutor::new(console.clone());
    let read = executor.run_query(&principal(Role::Operator), "select count(*) from experiment");
    assert!(matches!(read, QueryOutcome::Rows { .. }));
    let write = executor.run_query(&principal(Role::Operator), "UPDATE experiment SET status='X'");
    assert!(matches!(write, QueryOutcome::Mutation { .. }));
    let kinds: Vec<&str> = console.calls().into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, vec!["read", "write"]);
}

#[test]
fn backend_faults_become_error_outcomes() {
    let console = Arc::new(RecordingConsole::failing("near \"SELEC\": syntax error"));
    let executor = QueryExecutor::new(console);
    let outcome = executor.run_query(&principal(Role::Admin), "SELEC 1");
    match outcome {
        QueryOutcome::Error {
            kind,
            message,
        } => {
            assert_eq!(kind, QueryFailureKind::Store);
            assert!(message.contains("syntax error"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn operator_statements_on_the_user_table_are_forbidden() {
    let console = Arc::new(RecordingConsole::default());
    let executor = QueryExecutor::new(console.clone());
    for text in [
        "UPDATE user SET role = 'admin' WHERE username = 'op'",
        "SELECT username, password_hash FROM user",
        "INSERT INTO \"user\" VALUES ('x', 'y', 'admin')",
        "PRAGMA writable_schema = ON",
    ] {
        let outcome = executor.run_query(&principal(Role::Operator), text);
        assert_eq!(outcome.label(), "forbidden", "{text}");
    }
    assert!(console.calls().is_empty());

    let outcome = executor.run_query(&principal(Role::Admin), "SELECT username FROM user");
    assert!(matches!(outcome, QueryOutcome::Rows { .. }));
    assert_eq!(console.calls().len(), 1);
}
