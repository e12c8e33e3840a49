//! In-process cache implementation backed by `moka`.

use super::service::{CacheResult, CacheService, CacheTtls, CachedUrl};
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// Expires each URL entry after the TTL stored alongside it.
struct PerEntryTtl;

impl Expiry<String, (CachedUrl, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(CachedUrl, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(CachedUrl, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

type VisitorSet = Arc<Mutex<HashSet<String>>>;

/// Cache kept in the memory of a single process.
///
/// Used when Redis is not configured or unreachable, and in tests. Entries are
/// bounded by count and expire by TTL. Nothing is shared between replicas, so
/// a multi-node deployment should use [`super::RedisCache`].
pub struct MemoryCache {
    urls: Cache<String, (CachedUrl, Duration)>,
    visitors: Cache<i64, VisitorSet>,
    ttls: CacheTtls,
}

impl MemoryCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self::with_capacity(ttls, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttls: CacheTtls, max_entries: u64) -> Self {
        debug!(max_entries, "Using in-process cache");

        let urls = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        let visitors = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttls.unique_visitors)
            .build();

        Self {
            urls,
            visitors,
            ttls,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_url(&self, code: &str) -> CacheResult<Option<CachedUrl>> {
        Ok(self.urls.get(code).await.map(|(entry, _)| entry))
    }

    async fn set_url(
        &self,
        code: &str,
        entry: &CachedUrl,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.ttls.url);
        self.urls
            .insert(code.to_string(), (entry.clone(), ttl))
            .await;
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        self.urls.invalidate(code).await;
        Ok(())
    }

    async fn add_unique_visitor(&self, short_url_id: i64, ip: &str) -> CacheResult<bool> {
        let set = self
            .visitors
            .get_with(short_url_id, async { Arc::new(Mutex::new(HashSet::new())) })
            .await;

        let added = set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(ip.to_string());

        // Re-inserting restarts the set's time to live.
        if added {
            self.visitors.insert(short_url_id, set).await;
        }

        Ok(added)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
