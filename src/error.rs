//! Application error type shared by every layer.
//!
//! Repository implementations, the code generator and the resolution service
//! all return [`AppError`]. Cache failures never show up here: they are
//! absorbed by [`crate::infrastructure::cache::ResolutionCache`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

/// Errors produced while creating, resolving or mutating short URLs.
#[derive(Debug, Error)]
pub enum AppError {
    /// Destination is not a parseable `http`/`https` URL.
    #[error("Invalid destination URL: {reason}")]
    InvalidUrl { reason: String },

    /// Custom alias violates the length, charset or reserved-word rule.
    #[error("Invalid custom alias '{alias}': {reason}")]
    InvalidAliasFormat { alias: String, reason: String },

    /// Custom alias is already used by another live record.
    #[error("Custom alias '{alias}' already exists")]
    AliasExists { alias: String },

    /// Store-level unique violation on `code`.
    ///
    /// The resolution service maps this to a retry (random codes) or to
    /// [`AppError::AliasExists`] (custom aliases).
    #[error("Short code '{code}' already exists")]
    CodeExists { code: String },

    /// Random generation hit the collision retry bound.
    #[error("Failed to generate a unique short code after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error("Short link not found")]
    NotFound,

    /// Record exists but is inactive or expired.
    #[error("Short link is no longer available")]
    Gone,

    /// Secret mismatch on resolution, or owner mismatch on update/delete.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: &'static str },

    #[error("Validation error: {0}")]
    Validation(String),

    /// Store call failed or timed out. Retryable.
    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_url(reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            reason: reason.into(),
        }
    }

    pub fn invalid_alias(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAliasFormat {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Machine-readable error code used in JSON bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidAliasFormat { .. } => "invalid_alias",
            Self::AliasExists { .. } | Self::CodeExists { .. } => "conflict",
            Self::GenerationExhausted { .. } => "generation_exhausted",
            Self::NotFound => "not_found",
            Self::Gone => "gone",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Validation(_) => "validation_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUrl { .. } | Self::InvalidAliasFormat { .. } | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::AliasExists { .. } | Self::CodeExists { .. } => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Gone => StatusCode::GONE,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::GenerationExhausted { .. } | Self::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::store_unavailable("connection pool timed out"),
            other => Self::store_unavailable(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: ErrorInfo {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
