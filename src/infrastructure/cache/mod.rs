//! Caching layer for fast redirect lookups.
//!
//! Provides a [`CacheService`] backend trait with two implementations:
//! - [`RedisCache`] - Production Redis-backed cache
//! - [`MemoryCache`] - In-process cache used without Redis and in tests
//!
//! Callers use [`ResolutionCache`], which bounds every call with a deadline
//! and absorbs all backend failures.

mod memory_cache;
mod redis_cache;
mod resolution_cache;
mod service;

pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;
pub use resolution_cache::{DEFAULT_CACHE_TIMEOUT, ResolutionCache};
pub use service::{
    CacheError, CacheResult, CacheService, CacheTtls, CachedUrl, unique_clicks_key, url_key,
};
