//! Read Cache
//!
//! Bounded memo for idempotent reads, keyed by the exact argument tuple.
//! Least-recently-used entries are evicted at capacity. Concurrent callers
//! with the same key share a single in-flight fetch; failures are never
//! cached.

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{DriveError, DriveResult};

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
}

/// Bounded LRU memo with atomic get-or-compute
#[derive(Clone)]
pub struct ReadCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    cache: Cache<K, V>,
    lookups: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<K, V> ReadCache<K, V>
where
    K: Hash + Eq + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` entries.
    /// With `ttl = None` entries live until evicted.
    pub fn new(name: &'static str, capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .name(name)
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru());

        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            name,
            cache: builder.build(),
            lookups: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the cached value for `key`, or run `fetch` to produce it.
    /// Only one `fetch` runs per key at a time; other callers wait for it.
    pub async fn get_or_fetch<F>(&self, key: K, fetch: F) -> DriveResult<V>
    where
        F: Future<Output = DriveResult<V>>,
    {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let misses = self.misses.clone();
        let name = self.name;

        let init = async move {
            misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache MISS ({})", name);
            fetch.await
        };

        self.cache
            .try_get_with(key, init)
            .await
            .map_err(|e: Arc<DriveError>| DriveError::clone(&e))
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).await
    }

    /// Drop every entry and reset counters
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.lookups.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Apply pending evictions (entry counts are otherwise eventually consistent)
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.lookups.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed).min(lookups);
        let hits = lookups - misses;

        CacheStats {
            entries: self.cache.entry_count(),
            hits,
            misses,
            hit_rate_percent: if lookups > 0 {
                (hits as f64 / lookups as f64) * 100.0
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_cache_hit_miss() {
        let cache: ReadCache<String, u32> = ReadCache::new("test", 16, None);

        let first = cache.get_or_fetch("a".to_string(), async { Ok(1) }).await;
        let second = cache.get_or_fetch("a".to_string(), async { Ok(2) }).await;

        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: ReadCache<String, u32> = ReadCache::new("test", 16, None);

        let failed = cache
            .get_or_fetch("k".to_string(), async { Err(DriveError::transient("boom")) })
            .await;
        assert!(failed.unwrap_err().is_transient());

        let ok = cache.get_or_fetch("k".to_string(), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_fetch() {
        let cache: ReadCache<String, u32> = ReadCache::new("test", 16, None);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("shared".to_string(), async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(5)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache: ReadCache<u32, u32> = ReadCache::new("test", 4, None);

        for key in 0..32 {
            cache.get_or_fetch(key, async move { Ok(key) }).await.unwrap();
        }
        cache.sync().await;

        assert!(cache.stats().entries <= 4);
    }

    #[tokio::test]
    async fn test_clear_resets() {
        let cache: ReadCache<String, u32> = ReadCache::new("test", 16, None);
        cache.get_or_fetch("a".to_string(), async { Ok(1) }).await.unwrap();

        cache.clear();
        cache.sync().await;

        assert!(cache.get(&"a".to_string()).await.is_none());
        assert_eq!(cache.stats().misses, 0);
    }
}
