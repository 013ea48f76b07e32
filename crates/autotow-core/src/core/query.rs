// crates/autotow-core/src/core/query.rs
// ============================================================================
// Module: AutoTow Query Console Types
// Description: Statement classification and ad-hoc query outcomes.
// Purpose: Describe console results independently of the SQL backend.
// Dependencies: base64, serde
// ============================================================================

//! ## Overview
//! The console accepts raw statement text. Classification is textual: a
//! statement is a read when it starts with `SELECT`, and destructive when it
//! contains the keyword `DELETE` or `DROP` anywhere. A statement touches
//! credentials when it names the `user` table or the `writable_schema`
//! pragma. Matching is case-insensitive and works on whole words, so
//! `dropped_at` does not match but `/*x*/DROP` and `"user"` do.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::Serializer;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Keywords that mark a statement as destructive.
const DESTRUCTIVE_KEYWORDS: [&str; 2] = ["DELETE", "DROP"];

/// Identifiers that reach credential storage or schema internals.
const CREDENTIAL_IDENTIFIERS: [&str; 2] = ["user", "writable_schema"];

/// How a console statement is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Executed and rolled back; returns rows.
    Read,
    /// Executed and committed; returns an affected-row count.
    Write,
}

impl StatementKind {
    /// Classifies statement text by its leading keyword.
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim_start();
        let is_select = trimmed.get(..6).is_some_and(|head| head.eq_ignore_ascii_case("SELECT"));
        if is_select { Self::Read } else { Self::Write }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Returns true when the text contains a destructive keyword.
#[must_use]
pub fn is_destructive(text: &str) -> bool {
    contains_word(text, &DESTRUCTIVE_KEYWORDS)
}

/// Returns true when the text references credential storage.
#[must_use]
pub fn touches_credentials(text: &str) -> bool {
    contains_word(text, &CREDENTIAL_IDENTIFIERS)
}

/// Case-insensitive whole-word search over identifier characters.
fn contains_word(text: &str, words: &[&str]) -> bool {
    text.split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .any(|word| words.iter().any(|candidate| word.eq_ignore_ascii_case(candidate)))
}

// ============================================================================
// SECTION: Result Values
// ============================================================================

/// A single result cell in its native scalar type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL NULL.
    Null,
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Real(f64),
    /// Text value.
    Text(String),
    /// Binary value.
    Blob(Vec<u8>),
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Real(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Blob(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => value.fmt(f),
            Self::Real(value) => value.fmt(f),
            Self::Text(value) => f.write_str(value),
            Self::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Columns and rows returned by a read statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    /// Column names in statement order.
    pub columns: Vec<String>,
    /// Row tuples, each the same width as `columns`.
    pub rows: Vec<Vec<CellValue>>,
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Why a console statement produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailureKind {
    /// Empty or oversized statement text.
    Validation,
    /// Destructive statement from a non-admin principal.
    Forbidden,
    /// The backend rejected or failed the statement.
    Store,
}

impl QueryFailureKind {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Forbidden => "forbidden",
            Self::Store => "store",
        }
    }
}

/// Result of running a console statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Read statement result.
    Rows {
        /// Column names.
        columns: Vec<String>,
        /// Row tuples.
        rows: Vec<Vec<CellValue>>,
    },
    /// Write statement result.
    Mutation {
        /// Number of rows changed.
        affected: u64,
    },
    /// The statement was rejected or failed; nothing was committed.
    Error {
        /// Failure class.
        kind: QueryFailureKind,
        /// Human-readable message.
        message: String,
    },
}

impl QueryOutcome {
    /// Builds an error outcome.
    #[must_use]
    pub fn error(kind: QueryFailureKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Rows {
                ..
            } => "rows",
            Self::Mutation {
                ..
            } => "mutation",
            Self::Error {
                kind, ..
            } => kind.as_str(),
        }
    }
}

impl From<ResultTable> for QueryOutcome {
    fn from(table: ResultTable) -> Self {
        Self::Rows {
            columns: table.columns,
            rows: table.rows,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
