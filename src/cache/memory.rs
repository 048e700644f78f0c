use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{error::CacheResult, traits::Cache};
use crate::config::MemoryCacheConfig;

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Self {
            data,
            expires_at,
            last_accessed: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// In-memory cache implementation using DashMap for concurrent access.
///
/// **WARNING**: each node maintains its own independent cache, so state
/// stored here (sessions, pending redirect state) is not shared across nodes
/// and is lost on restart. Use the Redis cache for multi-node deployments.
pub struct MemoryCache {
    data: Arc<DashMap<String, CacheEntry>>,
    max_entries: usize,
    eviction_batch_size: usize,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            max_entries: config.max_entries,
            eviction_batch_size: config.eviction_batch_size.max(1),
        }
    }

    fn evict_if_needed(&self) {
        if self.data.len() < self.max_entries {
            return;
        }

        // First pass: remove all expired entries
        self.data.retain(|_, entry| !entry.is_expired());

        let current_len = self.data.len();
        if current_len < self.max_entries {
            return;
        }

        // Still at capacity: evict least recently used entries
        let target_size = self.max_entries.saturating_sub(self.eviction_batch_size);
        let to_evict = current_len.saturating_sub(target_size);
        if to_evict == 0 {
            return;
        }

        let mut entries: Vec<_> = self
            .data
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_accessed))
            .collect();
        entries.sort_by_key(|(_, last_accessed)| *last_accessed);

        for (key, _) in entries.into_iter().take(to_evict) {
            self.data.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if let Some(mut entry) = self.data.get_mut(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove(key);
                return Ok(None);
            }

            entry.touch();
            Ok(Some(entry.data.clone()))
        } else {
            Ok(None)
        }
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.evict_if_needed();

        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.data
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache(max_entries: usize) -> MemoryCache {
        MemoryCache::new(&MemoryCacheConfig {
            max_entries,
            eviction_batch_size: 2,
        })
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let cache = test_cache(16);

        cache
            .set_bytes("k", b"value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get_bytes("k").await.unwrap(),
            Some(b"value".to_vec())
        );

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get_bytes("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let cache = test_cache(16);
        cache.delete("never-set").await.unwrap();
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let cache = test_cache(16);

        cache
            .set_bytes("k", b"value", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get_bytes("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn eviction_keeps_cache_bounded() {
        let cache = test_cache(4);

        for i in 0..10 {
            cache
                .set_bytes(&format!("k{}", i), b"v", Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert!(cache.data.len() <= 4);
    }
}
