//! Cache backend trait, cached entry model and error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
    SerializationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
            Self::SerializationError(e) => write!(f, "Cache serialization error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Value stored under `url:{code}`.
///
/// Carries no liveness or secret data: access decisions are always made
/// against the store record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUrl {
    pub destination: String,
    pub owner: Option<i64>,
    /// Unix timestamp (seconds) of when the entry was written.
    pub cached_at: i64,
}

/// Default TTLs applied by cache backends.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    /// TTL of `url:{code}` entries when the caller passes none.
    pub url: Duration,
    /// TTL of the `unique_clicks:{id}` visitor sets.
    pub unique_visitors: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            url: Duration::from_secs(24 * 60 * 60),
            unique_visitors: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Builds the key of a cached short code.
pub fn url_key(code: &str) -> String {
    format!("url:{}", code)
}

/// Builds the key of a short URL's unique-visitor set.
pub fn unique_clicks_key(short_url_id: i64) -> String {
    format!("unique_clicks:{}", short_url_id)
}

/// Key-value backend for resolution entries and unique-visitor sets.
///
/// Backends report failures as [`CacheError`]; callers on the redirect path go
/// through [`crate::infrastructure::cache::ResolutionCache`], which turns every
/// failure into a miss or a no-op.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache for single-node setups and tests
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the entry for `code`, or `None` on absence or expiry.
    async fn get_url(&self, code: &str) -> CacheResult<Option<CachedUrl>>;

    /// Upserts the entry for `code`. Last write wins.
    ///
    /// `ttl` falls back to the backend's configured default.
    async fn set_url(&self, code: &str, entry: &CachedUrl, ttl: Option<Duration>)
    -> CacheResult<()>;

    /// Removes the entry for `code`.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Adds `ip` to the visitor set of `short_url_id`.
    ///
    /// Returns `true` if the address was not yet a member. The set expires
    /// `unique_visitors` after the last new member was added: every new
    /// address restarts the window, repeat visits do not.
    async fn add_unique_visitor(&self, short_url_id: i64, ip: &str) -> CacheResult<bool>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;
}
