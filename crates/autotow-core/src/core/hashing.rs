// crates/autotow-core/src/core/hashing.rs
// ============================================================================
// Module: AutoTow Hashing
// Description: SHA-256 digests, salted password hashes, constant-time compare.
// Purpose: Keep all secret-handling primitives in one audited place.
// Dependencies: base64, rand, sha2, subtle
// ============================================================================

//! ## Overview
//! Password hashes use iterated, salted SHA-256 and are encoded as
//! `sha256$<iterations>$<salt base64>$<digest hex>` so the work factor can be
//! raised without invalidating stored accounts. Comparisons of secret-derived
//! values are constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scheme label for password hashes.
const PASSWORD_SCHEME: &str = "sha256";
/// Default iteration count for new password hashes.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 10_000;
/// Upper bound accepted when decoding stored hashes.
const MAX_PASSWORD_ITERATIONS: u32 = 10_000_000;
/// Salt length in bytes.
const SALT_BYTES: usize = 16;
/// Fixed salt used to burn time when the account does not exist.
const DUMMY_SALT: [u8; SALT_BYTES] = [0x5a; SALT_BYTES];

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

/// Compares two strings in constant time.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ============================================================================
// SECTION: Password Hashing
// ============================================================================

/// Hashes a password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    hash_password_with(password, DEFAULT_PASSWORD_ITERATIONS)
}

/// Hashes a password with a fresh random salt and explicit work factor.
#[must_use]
pub fn hash_password_with(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    let iterations = iterations.max(1);
    let digest = stretch(password.as_bytes(), &salt, iterations);
    format!(
        "{PASSWORD_SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        hex_encode(&digest)
    )
}

/// Verifies a password against an encoded hash.
///
/// Malformed encodings verify as `false`.
#[must_use]
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let Some((iterations, salt, expected)) = decode_hash(encoded) else {
        return false;
    };
    let actual = hex_encode(&stretch(password.as_bytes(), &salt, iterations));
    constant_time_eq_str(&actual, expected)
}

/// Spends roughly the same time as a real verification.
///
/// Called for unknown usernames so login latency does not reveal whether an
/// account exists.
pub fn burn_password_check(password: &str) {
    let _ = stretch(password.as_bytes(), &DUMMY_SALT, DEFAULT_PASSWORD_ITERATIONS);
}

/// Splits an encoded hash into its parts.
fn decode_hash(encoded: &str) -> Option<(u32, Vec<u8>, &str)> {
    let mut parts = encoded.split('$');
    let scheme = parts.next()?;
    let iterations = parts.next()?.parse::<u32>().ok()?;
    let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    let digest = parts.next()?;
    if parts.next().is_some()
        || scheme != PASSWORD_SCHEME
        || iterations == 0
        || iterations > MAX_PASSWORD_ITERATIONS
    {
        return None;
    }
    Some((iterations, salt, digest))
}

/// Iterated salted SHA-256.
fn stretch(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password);
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(password);
        digest = hasher.finalize().into();
    }
    digest
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Lowercase hex encoding.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        reason = "Test-only assertions."
    )]

    use super::hash_password_with;
    use super::sha256_hex;
    use super::verify_password;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn password_hash_verifies_and_is_salted() {
        let first = hash_password_with("s3cret", 4);
        let second = hash_password_with("s3cret", 4);
        assert_ne!(first, second);
        assert!(verify_password("s3cret", &first));
        assert!(verify_password("s3cret", &second));
        assert!(!verify_password("S3cret", &first));
        assert!(!first.contains("s3cret"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain"));
        assert!(!verify_password("x", "md5$1$AAAA$00"));
        assert!(!verify_password("x", "sha256$0$AAAA$00"));
        assert!(!verify_password("x", "sha256$1$AAAA$00$extra"));
    }
}
