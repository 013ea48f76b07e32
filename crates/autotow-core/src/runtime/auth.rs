// crates/autotow-core/src/runtime/auth.rs
// ============================================================================
// Module: AutoTow Authenticator
// Description: Credential verification, registration, and session registry.
// Purpose: Gate the dashboard and console behind a session principal.
// Dependencies: crate::core, crate::interfaces, base64, rand
// ============================================================================

//! ## Overview
//! Login failures are uniform: an unknown username and a wrong password both
//! yield [`ServiceError::InvalidCredentials`], and unknown usernames still
//! pay for a hash computation. Sessions are server-side; the browser only
//! holds `<token>.<tag>` where the tag binds the token to the configured
//! secret key, so forged or truncated cookies resolve to no session.
//! Sessions expire a fixed time after login, and the registry holds at most
//! a configured number of them, evicting the oldest first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::Account;
use crate::core::NewAccountRequest;
use crate::core::Principal;
use crate::core::Role;
use crate::core::ServiceError;
use crate::core::Username;
use crate::core::hashing::burn_password_check;
use crate::core::hashing::constant_time_eq_str;
use crate::core::hashing::hash_password;
use crate::core::hashing::sha256_hex;
use crate::core::hashing::verify_password;
use crate::interfaces::CredentialStore;
use crate::interfaces::InsertOutcome;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted password length in bytes.
pub const MAX_PASSWORD_BYTES: usize = 256;
/// Random bytes per session token.
const SESSION_TOKEN_BYTES: usize = 32;
/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);
/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

// ============================================================================
// SECTION: Session Registry
// ============================================================================

/// Principal captured at login.
#[derive(Clone)]
struct SessionEntry {
    /// Logged-in principal.
    principal: Principal,
    /// Login time.
    issued_at: Instant,
    /// Issue order, used for eviction.
    sequence: u64,
}

/// In-process session table.
#[derive(Clone)]
pub struct SessionRegistry {
    /// Secret mixed into cookie tags.
    secret_key: Arc<str>,
    /// Active sessions keyed by token.
    sessions: Arc<Mutex<BTreeMap<String, SessionEntry>>>,
    /// Lifetime of a session after login.
    ttl: Duration,
    /// Maximum live sessions.
    max_sessions: usize,
    /// Next issue sequence number.
    next_sequence: Arc<AtomicU64>,
}

impl SessionRegistry {
    /// Creates an empty registry bound to `secret_key` with default limits.
    #[must_use]
    pub fn new(secret_key: &str) -> Self {
        Self::with_limits(secret_key, DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    /// Creates an empty registry with an explicit lifetime and capacity.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_limits(secret_key: &str, ttl: Duration, max_sessions: usize) -> Self {
        Self {
            secret_key: Arc::from(secret_key),
            sessions: Arc::new(Mutex::new(BTreeMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
            next_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts a session and returns the cookie value.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the registry lock is poisoned.
    pub fn issue(&self, principal: Principal) -> Result<String, ServiceError> {
        let mut bytes = [0u8; SESSION_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let cookie = format!("{token}.{}", self.tag(&token));
        let mut sessions = self.sessions.lock().map_err(|_| poisoned())?;
        let now = Instant::now();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(token, _)| token.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }
        sessions.insert(
            token,
            SessionEntry {
                principal,
                issued_at: now,
                sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            },
        );
        Ok(cookie)
    }

    /// Resolves a cookie value to the principal captured at login.
    ///
    /// Unknown, expired, revoked, or tampered cookies resolve to `None`.
    #[must_use]
    pub fn resolve(&self, cookie: &str) -> Option<Principal> {
        let token = self.verified_token(cookie)?;
        let mut sessions = self.sessions.lock().ok()?;
        let entry = sessions.get(token)?;
        if self.is_expired(entry, Instant::now()) {
            sessions.remove(token);
            return None;
        }
        Some(entry.principal.clone())
    }

    /// Ends the session behind `cookie`, if any.
    pub fn revoke(&self, cookie: &str) {
        let Some(token) = self.verified_token(cookie) else {
            return;
        };
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(token);
        }
    }

    /// Ends every session.
    pub fn clear(&self) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.clear();
        }
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|sessions| sessions.len()).unwrap_or_default()
    }

    /// Returns true when no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once `entry` has outlived the session lifetime.
    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.issued_at) >= self.ttl
    }

    /// Splits a cookie and checks its tag.
    fn verified_token<'a>(&self, cookie: &'a str) -> Option<&'a str> {
        let (token, tag) = cookie.split_once('.')?;
        if token.is_empty() || !constant_time_eq_str(&self.tag(token), tag) {
            return None;
        }
        Some(token)
    }

    /// Computes the secret-bound tag for a token.
    fn tag(&self, token: &str) -> String {
        sha256_hex(format!("{}.{token}", self.secret_key).as_bytes())
    }
}

// ============================================================================
// SECTION: Authenticator
// ============================================================================

/// Credential verification and account registration.
#[derive(Clone)]
pub struct Authenticator {
    /// Account persistence.
    credentials: Arc<dyn CredentialStore>,
}

impl Authenticator {
    /// Builds an authenticator over a credential store.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
        }
    }

    /// Verifies a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidCredentials`] for an unknown user or a
    /// wrong password alike, and [`ServiceError::Store`] on persistence
    /// failure.
    pub fn login(&self, username: &str, password: &str) -> Result<Principal, ServiceError> {
        let Ok(username) = Username::parse(username) else {
            burn_password_check(password);
            return Err(ServiceError::InvalidCredentials);
        };
        match self.credentials.find_account(&username)? {
            Some(account) if verify_password(password, &account.password_hash) => {
                Ok(Principal::from(&account))
            }
            Some(_) => Err(ServiceError::InvalidCredentials),
            None => {
                burn_password_check(password);
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    /// Re-reads the account behind a session principal.
    ///
    /// Returns `None` when the account no longer exists; otherwise the
    /// principal carries the account's current role.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] on persistence failure.
    pub fn refresh(&self, principal: &Principal) -> Result<Option<Principal>, ServiceError> {
        Ok(self.credentials.find_account(&principal.username)?.map(|account| Principal::from(&account)))
    }

    /// Returns the principal when one is present.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] when `principal` is `None`.
    pub fn require_session(principal: Option<Principal>) -> Result<Principal, ServiceError> {
        principal.ok_or(ServiceError::Unauthenticated)
    }

    /// Ensures the principal holds the admin role.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] for non-admin principals.
    pub fn require_admin(principal: &Principal) -> Result<(), ServiceError> {
        if principal.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("admin role required".to_string()))
        }
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for unusable usernames or
    /// passwords, [`ServiceError::DuplicateKey`] when the username is taken,
    /// and [`ServiceError::Store`] on persistence failure.
    pub fn register(&self, request: NewAccountRequest) -> Result<Principal, ServiceError> {
        let account = build_account(request)?;
        match self.credentials.insert_account(&account)? {
            InsertOutcome::Created => Ok(Principal::from(&account)),
            InsertOutcome::Duplicate => Err(ServiceError::DuplicateKey(format!(
                "username {} already exists",
                account.username
            ))),
        }
    }

    /// Creates `request` as an admin account when no accounts exist.
    ///
    /// Returns `true` when the account was created.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the request is invalid or the store
    /// fails.
    pub fn bootstrap(&self, request: NewAccountRequest) -> Result<bool, ServiceError> {
        if self.credentials.account_count()? > 0 {
            return Ok(false);
        }
        let account = build_account(NewAccountRequest {
            role: Some(Role::Admin),
            ..request
        })?;
        Ok(self.credentials.insert_account(&account)? == InsertOutcome::Created)
    }
}

/// Validates a registration request and hashes its password.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] for unusable usernames or passwords.
pub fn build_account(request: NewAccountRequest) -> Result<Account, ServiceError> {
    let username = Username::parse(&request.username)
        .map_err(|rejection| ServiceError::Validation(format!("invalid username: {rejection}")))?;
    if request.password.is_empty() {
        return Err(ServiceError::Validation("password must be non-empty".to_string()));
    }
    if request.password.len() > MAX_PASSWORD_BYTES {
        return Err(ServiceError::Validation("password exceeds length limit".to_string()));
    }
    Ok(Account {
        username,
        password_hash: hash_password(&request.password),
        role: request.role.unwrap_or_default(),
    })
}

/// Error for a poisoned session lock.
fn poisoned() -> ServiceError {
    ServiceError::Store(StoreError::Store("session registry mutex poisoned".to_string()))
}
