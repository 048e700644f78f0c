mod error;
mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repos;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use memory::{MemoryOauthProfileRepo, MemoryUserRepo};
pub use repos::{OauthProfileRepo, UserRepo};

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    users: Arc<dyn UserRepo>,
    oauth_profiles: Arc<dyn OauthProfileRepo>,
}

enum PoolStorage {
    Memory,
    #[cfg(feature = "postgres")]
    Postgres(sqlx::PgPool),
}

/// Database handle holding the connection pool and its repositories.
///
/// Constructed explicitly at startup and shared across requests; there is no
/// lazy first-use initialization.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a pool backed by in-memory repositories.
    /// Development and tests only.
    pub fn in_memory() -> Self {
        DbPool {
            inner: PoolStorage::Memory,
            repos: CachedRepos {
                users: Arc::new(MemoryUserRepo::new()),
                oauth_profiles: Arc::new(MemoryOauthProfileRepo::new()),
            },
        }
    }

    /// Create a DbPool from an existing PostgreSQL pool.
    /// Primarily useful for testing.
    #[cfg(feature = "postgres")]
    pub fn from_postgres(pool: sqlx::PgPool) -> Self {
        DbPool {
            repos: CachedRepos {
                users: Arc::new(postgres::PostgresUserRepo::new(pool.clone())),
                oauth_profiles: Arc::new(postgres::PostgresOauthProfileRepo::new(pool.clone())),
            },
            inner: PoolStorage::Postgres(pool),
        }
    }

    /// Build a pool from configuration.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::Query(
                "database is not configured".to_string(),
            )),
            DatabaseConfig::Memory => {
                tracing::warn!(
                    "Using in-memory user repositories. All users are lost on restart."
                );
                Ok(Self::in_memory())
            }
            #[allow(unused_variables)]
            DatabaseConfig::Postgres(pg) => {
                #[cfg(feature = "postgres")]
                {
                    let pool = sqlx::postgres::PgPoolOptions::new()
                        .min_connections(pg.min_connections)
                        .max_connections(pg.max_connections)
                        .acquire_timeout(std::time::Duration::from_secs(pg.connect_timeout_secs))
                        .connect(&pg.url)
                        .await?;

                    tracing::info!(
                        min_connections = pg.min_connections,
                        max_connections = pg.max_connections,
                        "Connected to Postgres"
                    );
                    Ok(Self::from_postgres(pool))
                }
                #[cfg(not(feature = "postgres"))]
                {
                    Err(DbError::Query(
                        "Postgres configured but the 'postgres' feature is not enabled. \
                         Rebuild with: cargo build --features postgres"
                            .to_string(),
                    ))
                }
            }
        }
    }

    /// Run embedded migrations. A no-op for the memory backend.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            PoolStorage::Memory => Ok(()),
            #[cfg(feature = "postgres")]
            PoolStorage::Postgres(pool) => sqlx::migrate!("./migrations")
                .run(pool)
                .await
                .map_err(|e| DbError::Migration(e.to_string())),
        }
    }

    pub fn users(&self) -> Arc<dyn UserRepo> {
        self.repos.users.clone()
    }

    pub fn oauth_profiles(&self) -> Arc<dyn OauthProfileRepo> {
        self.repos.oauth_profiles.clone()
    }

    /// Round-trip connectivity check, used by the health endpoint.
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            PoolStorage::Memory => Ok(()),
            #[cfg(feature = "postgres")]
            PoolStorage::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
        }
    }
}
