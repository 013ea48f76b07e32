// crates/autotow-core/src/core/account.rs
// ============================================================================
// Module: AutoTow Accounts
// Description: Account, role, and session principal types.
// Purpose: Model credential-store rows and authenticated identities.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Accounts carry a salted password hash (see [`crate::core::hashing`]) and
//! never the plaintext. A [`Principal`] is what a session holds after a
//! successful login; it is never persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Username;

// ============================================================================
// SECTION: Role
// ============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May run destructive statements and administer accounts.
    Admin,
    /// Read/write console access without destructive statements.
    #[default]
    Operator,
}

impl Role {
    /// Returns the stored label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("admin") {
            Ok(Self::Admin)
        } else if value.eq_ignore_ascii_case("operator") {
            Ok(Self::Operator)
        } else {
            Err(format!("unknown role: {value}"))
        }
    }
}

// ============================================================================
// SECTION: Account
// ============================================================================

/// Credential store row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique, immutable username.
    pub username: Username,
    /// Encoded salted password hash.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
}

/// Registration request as received from the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccountRequest {
    /// Requested username.
    pub username: String,
    /// Plaintext password; hashed before it reaches the store.
    pub password: String,
    /// Requested role, defaults to operator.
    #[serde(default)]
    pub role: Option<Role>,
}

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Authenticated identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Account username.
    pub username: Username,
    /// Account role at login time.
    pub role: Role,
}

impl Principal {
    /// Returns true when the principal holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            role: account.role,
        }
    }
}
