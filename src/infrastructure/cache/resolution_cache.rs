//! Fail-open adapter between the resolution service and a cache backend.

use super::service::{CacheService, CachedUrl};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default deadline for a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(100);

/// Resolution cache in front of the URL store.
///
/// The cache is an optimization, never a dependency for correctness. Every
/// call carries a deadline; a timeout or backend error is logged and turned
/// into a miss (`get`), a no-op (`put`, `invalidate`) or "not unique"
/// (`mark_unique_if_new`). Nothing here ever returns an error.
#[derive(Clone)]
pub struct ResolutionCache {
    backend: Arc<dyn CacheService>,
    timeout: Duration,
}

impl ResolutionCache {
    pub fn new(backend: Arc<dyn CacheService>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Runs a backend call under the deadline, absorbing any failure.
    async fn bounded<T, E, F>(&self, op: &'static str, key: &str, fut: F) -> Option<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, key, error = %e, "Cache operation failed, continuing without cache");
                None
            }
            Err(_) => {
                warn!(
                    op,
                    key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Cache operation timed out, continuing without cache"
                );
                None
            }
        }
    }

    /// Looks up `code`. Absence, expiry, errors and timeouts are all misses.
    pub async fn get(&self, code: &str) -> Option<CachedUrl> {
        let hit = self
            .bounded("get", code, self.backend.get_url(code))
            .await
            .flatten();

        match &hit {
            Some(_) => debug!(code, "Cache HIT"),
            None => debug!(code, "Cache MISS"),
        }
        hit
    }

    /// Writes `code -> (destination, owner)` with the backend's default TTL.
    pub async fn put(&self, code: &str, destination: &str, owner: Option<i64>) {
        let entry = CachedUrl {
            destination: destination.to_string(),
            owner,
            cached_at: Utc::now().timestamp(),
        };

        self.bounded("put", code, self.backend.set_url(code, &entry, None))
            .await;
    }

    /// Removes the entry for `code`.
    pub async fn invalidate(&self, code: &str) {
        self.bounded("invalidate", code, self.backend.invalidate(code))
            .await;
    }

    /// Records `ip` as a visitor of `short_url_id`.
    ///
    /// Returns `true` only if the address was not seen within the current
    /// window. A failed cache call returns `false`, so failures under-count.
    pub async fn mark_unique_if_new(&self, short_url_id: i64, ip: &str) -> bool {
        let key = short_url_id.to_string();
        self.bounded(
            "mark_unique",
            &key,
            self.backend.add_unique_visitor(short_url_id, ip),
        )
        .await
        .unwrap_or(false)
    }

    pub async fn health_check(&self) -> bool {
        timeout(self.timeout, self.backend.health_check())
            .await
            .unwrap_or(false)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
