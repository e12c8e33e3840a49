//! Repository trait for click persistence.

use crate::domain::entities::{Click, NewClick};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable storage for click events.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Inserts a click row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the referenced short URL does not exist.
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn create(&self, new_click: NewClick) -> Result<Click, AppError>;

    /// Counts clicks recorded for a short URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn count_by_short_url(&self, short_url_id: i64) -> Result<i64, AppError>;
}
