//! Redirect-state storage for the authorization-code flow.
//!
//! A pending authorization attempt is a single-use mapping from an opaque
//! random state key to the URL the user was originally trying to reach.
//! The callback consumes the entry exactly once; a missing entry — never
//! created, already consumed, or expired out of the cache — is the CSRF
//! guard rejecting the callback.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use super::session::{Session, StoreError, StoreResult};
use crate::{
    cache::{Cache, CacheExt},
    config::{ConfigError, StateStoreBackend, StateStoreConfig},
};

/// Durable short-lived mapping from a state key to the original request URL.
///
/// The `Session` parameter is the request context: the session-embedded
/// backend reads and writes the session record (persisted by the caller),
/// while the cache backend ignores it.
#[async_trait]
pub trait RedirectStateStore: Send + Sync {
    async fn get(&self, session: &Session, state_key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, session: &mut Session, state_key: &str, url: &str) -> StoreResult<()>;

    /// Remove the entry. Idempotent: deleting a missing key is not an error.
    async fn del(&self, session: &mut Session, state_key: &str) -> StoreResult<()>;
}

/// State store embedding pending redirects in the user's session record.
///
/// No extra infrastructure, but state exists only where the session cookie
/// does; a callback arriving without the cookie cannot resolve its state.
pub struct SessionStateStore;

#[async_trait]
impl RedirectStateStore for SessionStateStore {
    async fn get(&self, session: &Session, state_key: &str) -> StoreResult<Option<String>> {
        Ok(session.pending_redirects.get(state_key).cloned())
    }

    async fn set(&self, session: &mut Session, state_key: &str, url: &str) -> StoreResult<()> {
        session
            .pending_redirects
            .insert(state_key.to_string(), url.to_string());
        Ok(())
    }

    async fn del(&self, session: &mut Session, state_key: &str) -> StoreResult<()> {
        session.pending_redirects.remove(state_key);
        Ok(())
    }
}

/// State store backed by the shared cache with a TTL.
///
/// Entries auto-expire after the configured window, bounding abandoned-flow
/// storage growth. An entry that vanished before use is indistinguishable
/// from one that never existed.
pub struct CacheStateStore {
    cache: Arc<dyn Cache>,
    key_prefix: String,
    ttl: Duration,
}

impl CacheStateStore {
    pub fn new(cache: Arc<dyn Cache>, config: &StateStoreConfig) -> Self {
        Self {
            cache,
            key_prefix: config.key_prefix.clone(),
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    fn state_key(&self, state_key: &str) -> String {
        format!("{}{}", self.key_prefix, state_key)
    }
}

#[async_trait]
impl RedirectStateStore for CacheStateStore {
    async fn get(&self, _session: &Session, state_key: &str) -> StoreResult<Option<String>> {
        self.cache
            .get_json(&self.state_key(state_key))
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))
    }

    async fn set(&self, _session: &mut Session, state_key: &str, url: &str) -> StoreResult<()> {
        self.cache
            .set_json(&self.state_key(state_key), &url, self.ttl)
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))
    }

    async fn del(&self, _session: &mut Session, state_key: &str) -> StoreResult<()> {
        self.cache
            .delete(&self.state_key(state_key))
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))
    }
}

/// Create the configured redirect-state store.
///
/// The backend is an explicit configuration choice; the cache backend
/// requires a configured cache (enforced again here for programmatic
/// construction).
pub fn create_state_store(
    config: &StateStoreConfig,
    cache: Option<Arc<dyn Cache>>,
) -> Result<Arc<dyn RedirectStateStore>, ConfigError> {
    match config.backend {
        StateStoreBackend::Session => {
            tracing::info!("Using session-embedded redirect-state store");
            Ok(Arc::new(SessionStateStore))
        }
        StateStoreBackend::Cache => match cache {
            Some(cache) => {
                tracing::info!(ttl_secs = config.ttl_secs, "Using cache-backed redirect-state store");
                Ok(Arc::new(CacheStateStore::new(cache, config)))
            }
            None => Err(ConfigError::Validation(
                "auth.state_store.backend = \"cache\" requires a cache configuration".into(),
            )),
        },
    }
}
