//! Hashing and verification of link secrets.
//!
//! A secret is stored as `hex(salt)$hex(mac)`, where `mac` is HMAC-SHA256 of
//! the secret keyed by a random 16-byte salt. Verification recomputes the MAC
//! with the stored salt and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;

fn keyed_mac(salt: &[u8], secret: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(salt).expect("HMAC accepts any key length");
    mac.update(secret.as_bytes());
    mac
}

/// Hashes a raw secret with a fresh random salt.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the system random source fails.
pub fn hash_secret(secret: &str) -> Result<String, AppError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::fill(&mut salt)
        .map_err(|e| AppError::Internal(format!("random source failed: {e}")))?;

    let digest = keyed_mac(&salt, secret).finalize().into_bytes();

    Ok(format!("{}${}", hex::encode(salt), hex::encode(digest)))
}

/// Checks `supplied` against a value produced by [`hash_secret`].
///
/// Returns `false` for malformed stored values.
pub fn verify_secret(supplied: &str, stored: &str) -> bool {
    let Some((salt_hex, mac_hex)) = stored.split_once('$') else {
        return false;
    };

    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(mac_hex)) else {
        return false;
    };

    keyed_mac(&salt, supplied).verify_slice(&expected).is_ok()
}
