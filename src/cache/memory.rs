//! Memory cache implementation
//!
//! - `MemoryCache`: TTL + size-bounded cache backed by moka
//! - `NullCache`: no-op implementation for disabled caching

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::{CacheStats, ImageCache};

/// Upper bound on total cached bytes
const DEFAULT_MAX_CAPACITY_BYTES: u64 = 256 * 1024 * 1024;

/// Statistics tracker using atomics for thread safety
struct CacheStatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStatsTracker {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, entry_count: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        }
    }
}

/// MemoryCache wraps moka for the ImageCache trait
pub struct MemoryCache {
    cache: moka::sync::Cache<String, Bytes>,
    stats: Arc<CacheStatsTracker>,
}

impl MemoryCache {
    /// Create a cache whose entries live for `ttl`; zero means no expiration
    pub fn new(ttl: Duration) -> Self {
        let mut builder = moka::sync::Cache::builder()
            .max_capacity(DEFAULT_MAX_CAPACITY_BYTES)
            .weigher(|_key: &String, value: &Bytes| value.len().min(u32::MAX as usize) as u32);
        if !ttl.is_zero() {
            builder = builder.time_to_live(ttl);
        }

        Self {
            cache: builder.build(),
            stats: Arc::new(CacheStatsTracker::new()),
        }
    }
}

impl ImageCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        match self.cache.get(key) {
            Some(data) => {
                self.stats.record_hit();
                Some(data)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn set(&self, key: String, data: Bytes) {
        self.cache.insert(key, data);
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.cache.entry_count())
    }
}

/// No-op cache used when caching is disabled
pub struct NullCache;

impl ImageCache for NullCache {
    fn get(&self, _key: &str) -> Option<Bytes> {
        None
    }

    fn set(&self, _key: String, _data: Bytes) {}

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("cat.png.IQAAASA=".to_string(), Bytes::from_static(b"blob"));
        assert_eq!(
            cache.get("cat.png.IQAAASA=").unwrap(),
            Bytes::from_static(b"blob")
        );
    }

    #[test]
    fn test_get_missing_returns_none() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("k".to_string(), Bytes::from_static(b"one"));
        cache.set("k".to_string(), Bytes::from_static(b"two"));
        assert_eq!(cache.get("k").unwrap(), Bytes::from_static(b"two"));
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.set("k".to_string(), Bytes::from_static(b"v"));
        let _ = cache.get("k");
        let _ = cache.get("k");
        let _ = cache.get("absent");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_zero_ttl_means_no_expiration() {
        let cache = MemoryCache::new(Duration::from_secs(0));
        cache.set("k".to_string(), Bytes::from_static(b"v"));
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_null_cache_never_stores() {
        let cache = NullCache;
        cache.set("k".to_string(), Bytes::from_static(b"v"));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
