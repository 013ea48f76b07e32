// crates/autotow-core/src/core/identifiers.rs
// ============================================================================
// Module: AutoTow Identifiers
// Description: Validated identifiers for records and accounts.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! External record identifiers appear verbatim in public report URLs and
//! usernames key the credential table, so both are validated on construction.
//! Both serialize as plain strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum external identifier length in bytes.
pub const MAX_EXTERNAL_ID_LENGTH: usize = 128;
/// Maximum username length in characters.
pub const MAX_USERNAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Rejections
// ============================================================================

/// Typed rejection reason for invalid identifiers.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRejection {
    /// Input was empty after trimming.
    Empty,
    /// Input exceeded the maximum length.
    TooLong,
    /// Input contained whitespace.
    ContainsWhitespace,
    /// Input contained control characters.
    ContainsControlChar,
    /// Input contained a URL-reserved character.
    ContainsReservedChar,
}

impl IdRejection {
    /// Returns a stable label for this rejection reason.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::ContainsWhitespace => "contains_whitespace",
            Self::ContainsControlChar => "contains_control_char",
            Self::ContainsReservedChar => "contains_reserved_char",
        }
    }
}

impl fmt::Display for IdRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: External Identifier
// ============================================================================

/// Public identifier of an experiment record (the client "uuid").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Parses a client-supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdRejection`] when the value cannot be used in a report URL.
    pub fn parse(raw: &str) -> Result<Self, IdRejection> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdRejection::Empty);
        }
        if trimmed.len() > MAX_EXTERNAL_ID_LENGTH {
            return Err(IdRejection::TooLong);
        }
        for ch in trimmed.chars() {
            if ch.is_control() {
                return Err(IdRejection::ContainsControlChar);
            }
            if ch.is_whitespace() {
                return Err(IdRejection::ContainsWhitespace);
            }
            if matches!(ch, '/' | '?' | '#' | '\\') {
                return Err(IdRejection::ContainsReservedChar);
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Wraps a value already known to satisfy the identifier rules.
    ///
    /// Used for server-generated tokens and rows read back from the store.
    #[must_use]
    pub fn from_trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Username
// ============================================================================

/// Account username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Parses a username. Matching is exact; no case folding is applied.
    ///
    /// # Errors
    ///
    /// Returns [`IdRejection`] when the username is empty, too long, or
    /// contains whitespace or control characters.
    pub fn parse(raw: &str) -> Result<Self, IdRejection> {
        if raw.trim().is_empty() {
            return Err(IdRejection::Empty);
        }
        if raw.chars().count() > MAX_USERNAME_LENGTH {
            return Err(IdRejection::TooLong);
        }
        if raw.chars().any(char::is_control) {
            return Err(IdRejection::ContainsControlChar);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IdRejection::ContainsWhitespace);
        }
        Ok(Self(raw.to_string()))
    }

    /// Wraps a value read back from the credential store.
    #[must_use]
    pub fn from_trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
