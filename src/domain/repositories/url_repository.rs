//! Repository trait for short URL persistence.

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::error::AppError;
use async_trait::async_trait;

/// Durable storage for short URL records.
///
/// Every lookup excludes soft-deleted records. Code uniqueness is enforced by
/// the store itself (a unique index over live records) as the final guard
/// against concurrent generators.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_url.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Inserts a new record, assigning its id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CodeExists`] if a live record already uses the code.
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Finds a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn get_by_id(&self, id: i64) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a record by code regardless of `active` and `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn get_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a record by code only if it is active and unexpired.
    ///
    /// This is the lookup used on the redirect path.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn get_active_by_code(&self, code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Writes every mutable field of `url` and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record has `url.id`.
    /// Returns [`AppError::CodeExists`] if the code changed to one already in use.
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn update(&self, url: &ShortUrl) -> Result<ShortUrl, AppError>;

    /// Soft-deletes a record by setting `deleted_at = now()`.
    ///
    /// Returns `Ok(false)` if the record was not found or already deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    /// Atomically adds one to `click_count`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn increment_click_count(&self, id: i64) -> Result<(), AppError>;

    /// Lists records that are still active but whose expiry has passed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn list_expired(&self, limit: i64) -> Result<Vec<ShortUrl>, AppError>;

    /// Sets `active = false` only if the record is still live, active and
    /// expired at the time of the write. No other field is touched.
    ///
    /// Returns `Ok(false)` if the record no longer qualifies, for example
    /// because its owner extended the expiry after it was listed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn deactivate_expired(&self, id: i64) -> Result<bool, AppError>;

    /// Returns true if a live record uses `code`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] on database errors.
    async fn exists_by_code(&self, code: &str) -> Result<bool, AppError>;

    /// Cheap connectivity probe used by the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] if the store cannot be reached.
    async fn ping(&self) -> Result<(), AppError>;
}
