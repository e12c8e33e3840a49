//! Destination URL validation.

use url::Url;

use crate::error::AppError;

/// Validates a destination URL and returns the form to store.
///
/// The URL must parse, use the `http` or `https` scheme and carry a host.
/// Control characters anywhere in the input are rejected, since the parser
/// would silently drop them. Input made only of visible ASCII is stored as
/// given; anything else (spaces, non-ASCII) is stored in the parser's
/// percent-encoded form so it is always a valid `Location` header.
///
/// # Errors
///
/// Returns [`AppError::InvalidUrl`] if any check fails.
pub fn validate_destination(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_url("URL is empty"));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(AppError::invalid_url("URL contains control characters"));
    }

    let parsed = Url::parse(trimmed).map_err(|e| AppError::invalid_url(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::invalid_url(format!(
                "unsupported scheme '{other}', expected http or https"
            )));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::invalid_url("URL has no host"));
    }

    if trimmed.bytes().all(|b| b.is_ascii_graphic()) {
        Ok(trimmed.to_string())
    } else {
        Ok(parsed.into())
    }
}
