//! Redis-backed cache implementation.

use super::service::{
    CacheError, CacheResult, CacheService, CacheTtls, CachedUrl, unique_clicks_key, url_key,
};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Redis cache implementation.
///
/// Uses `ConnectionManager` for automatic reconnection and connection reuse.
/// Entries are JSON-encoded [`CachedUrl`] values; visitor sets are Redis sets.
pub struct RedisCache {
    client: ConnectionManager,
    ttls: CacheTtls,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, ttls: CacheTtls) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            ttls,
        })
    }
}

fn op_error(op: &str, e: redis::RedisError) -> CacheError {
    CacheError::OperationError(format!("Redis {} failed: {}", op, e))
}

/// The member is already in the set once `SADD` added it, so a failed
/// `EXPIRE` still counts the visitor as new.
fn new_visitor_outcome(short_url_id: i64, expired: redis::RedisResult<()>) -> bool {
    if let Err(e) = expired {
        warn!(short_url_id, error = %e, "Redis EXPIRE failed on visitor set");
    }
    true
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_url(&self, code: &str) -> CacheResult<Option<CachedUrl>> {
        let mut conn = self.client.clone();

        let raw: Option<String> = conn
            .get(url_key(code))
            .await
            .map_err(|e| op_error("GET", e))?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CacheError::SerializationError(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set_url(
        &self,
        code: &str,
        entry: &CachedUrl,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        let ttl_seconds = ttl.unwrap_or(self.ttls.url).as_secs().max(1);
        let mut conn = self.client.clone();

        conn.set_ex::<_, _, ()>(url_key(code), json, ttl_seconds)
            .await
            .map_err(|e| op_error("SET", e))?;

        debug!(code, ttl_seconds, "Cache SET");
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();

        let deleted: i64 = conn
            .del(url_key(code))
            .await
            .map_err(|e| op_error("DEL", e))?;

        if deleted > 0 {
            debug!(code, "Cache INVALIDATE");
        }
        Ok(())
    }

    async fn add_unique_visitor(&self, short_url_id: i64, ip: &str) -> CacheResult<bool> {
        let key = unique_clicks_key(short_url_id);
        let mut conn = self.client.clone();

        let added: i64 = conn
            .sadd(&key, ip)
            .await
            .map_err(|e| op_error("SADD", e))?;

        if added == 0 {
            return Ok(false);
        }

        let ttl_seconds = self.ttls.unique_visitors.as_secs().max(1) as i64;
        let expired = conn.expire::<_, ()>(&key, ttl_seconds).await;

        Ok(new_visitor_outcome(short_url_id, expired))
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
