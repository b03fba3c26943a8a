use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Read-through cache with per-entry TTL expiry. Entries are only dropped
/// lazily on lookup; there is no invalidation API, so a changed upstream is
/// reflected after the TTL lapses, not before.
pub struct TtlCache<V: Clone + Send + Sync> {
    entries: Arc<RwLock<HashMap<String, (V, Instant)>>>,
    stats: Arc<RwLock<CacheStats>>,
    ttl: Duration,
    enabled: bool,
}

impl<V: Clone + Send + Sync> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            ttl,
            enabled: true,
        }
    }

    /// A cache that never stores anything. Lets tests exercise the code paths
    /// behind a cache without time-dependent behavior.
    pub fn disabled() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        if self.enabled {
            let entries = self.entries.read().await;
            if let Some((value, stored_at)) = entries.get(key) {
                if stored_at.elapsed() < self.ttl {
                    self.stats.write().await.hits += 1;
                    return Some(value.clone());
                }
            }
        }
        self.stats.write().await.misses += 1;
        None
    }

    pub async fn insert(&self, key: String, value: V) {
        if !self.enabled {
            return;
        }
        self.entries.write().await.insert(key, (value, Instant::now()));
    }

    /// Returns the cached value for `key`, or runs `fill`, stores its output
    /// and returns it. Errors from `fill` are not cached.
    pub async fn remember<E, F, Fut>(&self, key: &str, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }
        let value = fill().await?;
        self.insert(key.to_string(), value.clone()).await;
        Ok(value)
    }

    pub async fn stats(&self) -> (u64, u64) {
        let stats = self.stats.read().await;
        (stats.hits, stats.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remember_fills_once_and_reuses() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;

        for _ in 0..3 {
            let value: Result<i32, ()> = cache
                .remember("k", || {
                    calls += 1;
                    async { Ok(42) }
                })
                .await;
            assert_eq!(value, Ok(42));
        }

        assert_eq!(calls, 1);
        let (hits, misses) = cache.stats().await;
        assert_eq!(hits, 2);
        assert_eq!(misses, 1);
    }

    #[tokio::test]
    async fn disabled_cache_always_refills() {
        let cache: TtlCache<i32> = TtlCache::disabled();
        let mut calls = 0;

        for _ in 0..2 {
            let _: Result<i32, ()> = cache
                .remember("k", || {
                    calls += 1;
                    async { Ok(1) }
                })
                .await;
        }

        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::ZERO);
        cache.insert("k".into(), 7).await;
        assert_eq!(cache.get("k").await, None);
    }
}
