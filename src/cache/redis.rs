use std::time::Duration;

use async_trait::async_trait;
use redis::{
    ConnectionInfo, IntoConnectionInfo, aio::MultiplexedConnection, cluster::ClusterClient,
    cluster_async::ClusterConnection,
};

use super::{error::CacheResult, traits::Cache};
use crate::config::RedisCacheConfig;

/// A wrapper enum for either a standalone or cluster Redis connection.
/// Both connection types implement the `AsyncCommands` trait, so we can use
/// the same command syntax for both.
enum RedisConn {
    Standalone(MultiplexedConnection),
    Cluster(ClusterConnection),
}

/// Macro to execute a Redis command on either connection type.
/// This avoids code duplication when dispatching commands to standalone vs cluster.
macro_rules! redis_cmd {
    ($conn:expr, $cmd:expr) => {
        match $conn {
            RedisConn::Standalone(ref mut c) => $cmd.query_async(c).await,
            RedisConn::Cluster(ref mut c) => $cmd.query_async(c).await,
        }
    };
}

/// Internal enum to hold either a standalone or cluster Redis client.
enum RedisConnection {
    Standalone(redis::Client),
    Cluster(ClusterClient),
}

pub struct RedisCache {
    connection: RedisConnection,
    key_prefix: String,
}

impl RedisCache {
    pub async fn from_config(config: &RedisCacheConfig) -> CacheResult<Self> {
        let connection = if let Some(cluster_config) = &config.cluster {
            // Cluster mode: parse nodes from URL (comma-separated)
            // e.g., "redis://host1:6379,host2:6379,host3:6379"
            let nodes: Vec<ConnectionInfo> = config
                .url
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| {
                    let node_url = if s.starts_with("redis://") || s.starts_with("rediss://") {
                        s.to_string()
                    } else {
                        format!("redis://{}", s)
                    };
                    node_url.into_connection_info()
                })
                .collect::<Result<Vec<_>, _>>()?;

            if nodes.is_empty() {
                return Err(super::error::CacheError::Redis(redis::RedisError::from((
                    redis::ErrorKind::InvalidClientConfig,
                    "No cluster nodes specified in URL",
                ))));
            }

            let mut builder = redis::cluster::ClusterClientBuilder::new(nodes);

            if cluster_config.read_from_replicas {
                builder = builder.read_from_replicas();
            }

            builder = builder.retries(cluster_config.retries);
            builder = builder
                .connection_timeout(Duration::from_secs(cluster_config.connection_timeout_secs));
            builder =
                builder.response_timeout(Duration::from_secs(cluster_config.response_timeout_secs));

            let cluster_client = builder.build()?;
            RedisConnection::Cluster(cluster_client)
        } else {
            // Standalone mode: single Redis instance
            let client = redis::Client::open(config.url.as_str())?;
            RedisConnection::Standalone(client)
        };

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Get a Redis connection, either standalone or cluster.
    async fn get_connection(&self) -> CacheResult<RedisConn> {
        match &self.connection {
            RedisConnection::Standalone(client) => {
                let conn = client.get_multiplexed_async_connection().await?;
                Ok(RedisConn::Standalone(conn))
            }
            RedisConnection::Cluster(client) => {
                let conn = client.get_async_connection().await?;
                Ok(RedisConn::Cluster(conn))
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        let data: Option<Vec<u8>> = redis_cmd!(conn, redis::cmd("GET").arg(&full_key))?;

        Ok(data)
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        if ttl.as_secs() > 0 {
            let _: () = redis_cmd!(
                conn,
                redis::cmd("SETEX")
                    .arg(&full_key)
                    .arg(ttl.as_secs())
                    .arg(value)
            )?;
        } else {
            let _: () = redis_cmd!(conn, redis::cmd("SET").arg(&full_key).arg(value))?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let full_key = self.prefixed_key(key);

        let _: () = redis_cmd!(conn, redis::cmd("DEL").arg(&full_key))?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        let _: String = redis_cmd!(conn, redis::cmd("PING"))?;
        Ok(())
    }
}
