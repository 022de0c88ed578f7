//! Rendered-image cache
//!
//! The service consults the cache with `get`/`set` only — it never iterates
//! or evicts; TTL expiry and size-based eviction belong to the backend. Keys
//! already encode the resource version (the spec bytes are bound to the
//! source's modification time upstream), so at most one freshness generation
//! per resource version is ever written under a given key.

mod memory;

pub use memory::{MemoryCache, NullCache};

use bytes::Bytes;
use tracing::warn;

use crate::config::CacheConfig;

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
}

/// Cache interface for rendered image blobs
pub trait ImageCache: Send + Sync {
    /// Get a rendered blob by key; None if absent or expired
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Store a rendered blob, overwriting any existing entry
    fn set(&self, key: String, data: Bytes);

    /// Current statistics
    fn stats(&self) -> CacheStats;
}

/// Build the cache backend named by the configuration
pub fn from_config(config: &CacheConfig) -> Box<dyn ImageCache> {
    if !config.enabled {
        return Box::new(NullCache);
    }
    if config.backend != "memory" {
        // validate() rejects this earlier; a hand-built config still gets a
        // working service rather than a panic.
        warn!(backend = %config.backend, "unknown cache backend, caching disabled");
        return Box::new(NullCache);
    }
    Box::new(MemoryCache::new(std::time::Duration::from_secs(
        config.ttl_seconds,
    )))
}
