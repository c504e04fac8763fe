//! Security Utilities
//!
//! Password hashing, verification token minting and other credential helpers.

use base64::prelude::*;
use bcrypt::{hash, verify, DEFAULT_COST};
use rand::{rngs::OsRng, RngCore};

/// Default bcrypt cost for password hashing
pub const DEFAULT_BCRYPT_COST: u32 = DEFAULT_COST;

/// Number of random bytes behind a verification token (256 bits)
pub const VERIFICATION_TOKEN_BYTES: usize = 32;

/// Hash a password using bcrypt
///
/// Every call draws a fresh salt, so hashing the same plaintext twice yields
/// two different digests. Both verify against the original plaintext.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash_password_with_cost(password, DEFAULT_BCRYPT_COST)
}

/// Hash a password with custom bcrypt cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against its hash
///
/// A malformed or truncated digest is treated as a mismatch rather than an
/// error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match verify(password, hash) {
        Ok(valid) => valid,
        Err(e) => {
            log::debug!("Password digest could not be checked: {}", e);
            false
        }
    }
}

/// Generate an opaque, URL-safe email verification token
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; VERIFICATION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Timing-safe string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}
