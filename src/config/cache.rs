use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Cache configuration.
///
/// The cache backs the session store and the cache-backed redirect-state
/// store. Without one, sessions live in process memory only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CacheConfig {
    /// No shared cache. Sessions fall back to in-process storage.
    /// Only suitable for local development.
    #[default]
    None,

    /// In-memory cache. Good for single-node deployments.
    /// Data is lost on restart. Not suitable for multi-node.
    Memory(MemoryCacheConfig),

    /// Redis cache. Required for multi-node deployments.
    Redis(RedisCacheConfig),
}

impl CacheConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, CacheConfig::None)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            CacheConfig::None => Ok(()),
            CacheConfig::Memory(c) => c.validate(),
            CacheConfig::Redis(c) => c.validate(),
        }
    }
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Number of entries to evict when cache is full.
    /// Eviction removes expired entries first, then uses LRU.
    #[serde(default = "default_eviction_batch_size")]
    pub eviction_batch_size: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            eviction_batch_size: default_eviction_batch_size(),
        }
    }
}

impl MemoryCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Validation(
                "Memory cache max_entries must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_entries() -> usize {
    100_000
}

fn default_eviction_batch_size() -> usize {
    100 // Evict 100 entries at a time when cache is full
}

/// Redis cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisCacheConfig {
    /// Redis connection URL.
    /// Format: redis://[user:password@]host:port[/database]
    /// For clusters: comma-separated node list.
    pub url: String,

    /// Key prefix for all cache keys.
    /// Useful when sharing a Redis instance with other applications.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Cluster mode configuration.
    #[serde(default)]
    pub cluster: Option<RedisClusterConfig>,
}

impl RedisCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Validation("Redis URL cannot be empty".into()));
        }
        Ok(())
    }
}

/// Redis cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisClusterConfig {
    /// Read from replicas for read operations.
    #[serde(default)]
    pub read_from_replicas: bool,

    /// Number of retries for cluster operations.
    #[serde(default = "default_cluster_retries")]
    pub retries: u32,

    /// Connection timeout for cluster nodes in seconds.
    #[serde(default = "default_cluster_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Response timeout for cluster operations in seconds.
    #[serde(default = "default_cluster_response_timeout")]
    pub response_timeout_secs: u64,
}

fn default_key_prefix() -> String {
    "pc:".to_string()
}

fn default_cluster_retries() -> u32 {
    3
}

fn default_cluster_connection_timeout() -> u64 {
    5
}

fn default_cluster_response_timeout() -> u64 {
    1
}
