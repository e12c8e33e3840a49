//! Short code generation and custom alias validation.
//!
//! Pure helpers used by [`crate::application::services::CodeGenerator`],
//! which adds the store existence checks and the retry bound.

use crate::error::AppError;
use rand::Rng;

/// Default alphabet for generated codes and custom aliases: `[A-Za-z0-9]`.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of generated codes (62^6, roughly 5.7e10 combinations).
pub const DEFAULT_CODE_LENGTH: usize = 6;

pub const MIN_CODE_LENGTH: usize = 3;
pub const MAX_CODE_LENGTH: usize = 20;

/// Codes that collide with service routes and cannot be used as aliases.
const RESERVED_CODES: &[&str] = &["health", "api", "admin", "static"];

/// Draws a random code of `length` characters from `alphabet`.
///
/// Uses the thread-local CSPRNG (`rand::rng()`), sampling each position
/// uniformly so no character is favoured by modulo bias.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(DEFAULT_ALPHABET.as_bytes(), 6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(alphabet: &[u8], length: usize) -> String {
    let mut rng = rand::rng();

    (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Validates a user-provided custom alias.
///
/// # Rules
///
/// - Length: 3-20 characters
/// - Allowed characters: those of `alphabet`
/// - Cannot be a reserved route name (case-insensitive)
///
/// # Errors
///
/// Returns [`AppError::InvalidAliasFormat`] if any rule is violated.
pub fn validate_custom_alias(alias: &str, alphabet: &[u8]) -> Result<(), AppError> {
    let len = alias.chars().count();
    if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&len) {
        return Err(AppError::invalid_alias(
            alias,
            format!("must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} characters, got {len}"),
        ));
    }

    if !alias.bytes().all(|b| alphabet.contains(&b)) {
        return Err(AppError::invalid_alias(
            alias,
            "may only contain letters and digits",
        ));
    }

    if RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(alias))
    {
        return Err(AppError::invalid_alias(alias, "this code is reserved"));
    }

    Ok(())
}
