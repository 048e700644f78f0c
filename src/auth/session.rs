//! Session storage backends.
//!
//! This module provides a `SessionStore` trait with two implementations:
//! - `MemorySessionStore`: in-process storage (single-node only)
//! - `CacheSessionStore`: uses the Cache infrastructure (memory or Redis)
//!
//! For multi-node deployments, use Redis via the cache.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::client::TokenResponse;
use crate::cache::{Cache, CacheExt};

/// Result type for session and state store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during session or state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The session-bound identity record.
///
/// Created only by the callback handler upon successful token exchange, and
/// overwritten whole (never merged) on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// Local user identifier, stable across logins.
    pub user_id: Uuid,

    /// Current provider access token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Provider refresh token, used to mint new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Absolute expiry of `access_token`. `None` means the token carries no
    /// local expiry tracking.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionUser {
    /// Build a fresh record from a token response, computing the absolute
    /// expiry from `expires_in`.
    pub fn from_tokens(user_id: Uuid, tokens: &TokenResponse) -> Self {
        Self {
            user_id,
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs as i64)),
        }
    }

    /// A record with all token fields cleared, forcing a future full
    /// re-authorization.
    pub fn cleared(user_id: Uuid) -> Self {
        Self {
            user_id,
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// True when the access token is missing or past its expiry.
    pub fn needs_refresh(&self) -> bool {
        self.access_token.is_none() || self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }
}

/// A cookie-addressed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,

    /// The authenticated identity, if any.
    #[serde(default)]
    pub user: Option<SessionUser>,

    /// Pending post-login redirects, keyed by state key. Used only by the
    /// session-embedded redirect-state store.
    #[serde(default)]
    pub pending_redirects: HashMap<String, String>,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(duration_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user: None,
            pending_redirects: HashMap::new(),
            created_at: now,
            expires_at: now + chrono::Duration::seconds(duration_secs as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Remaining lifetime as a Duration.
    pub fn ttl(&self) -> Duration {
        let now = Utc::now();
        if self.expires_at <= now {
            Duration::ZERO
        } else {
            (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
        }
    }
}

/// Trait for session storage.
///
/// Implementations must be thread-safe and handle concurrent access. Writes
/// are last-write-wins; no cross-request locking is provided or expected.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    async fn create_session(&self, session: Session) -> StoreResult<Uuid>;

    /// Get a session by ID.
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>>;

    /// Update a session (e.g., after token refresh).
    async fn update_session(&self, session: Session) -> StoreResult<()>;

    /// Delete a session.
    async fn delete_session(&self, id: Uuid) -> StoreResult<()>;
}

/// Load a session and drop it if expired.
pub async fn load_valid_session(
    store: &dyn SessionStore,
    id: Uuid,
) -> StoreResult<Option<Session>> {
    match store.get_session(id).await? {
        Some(session) if session.is_expired() => {
            let _ = store.delete_session(id).await;
            Ok(None)
        }
        other => Ok(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Session Store
// ─────────────────────────────────────────────────────────────────────────────

/// In-process session store.
///
/// Suitable for development and single-node deployments. Sessions are lost
/// on restart and not shared across nodes.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: Session) -> StoreResult<Uuid> {
        let id = session.id;
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, session);
        Ok(id)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn update_session(&self, session: Session) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session);
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Session Store (memory/Redis via Cache trait)
// ─────────────────────────────────────────────────────────────────────────────

/// Session store backed by the Cache infrastructure.
///
/// Sessions are stored as JSON with TTL. Suitable for multi-node
/// deployments when the cache backend is Redis.
pub struct CacheSessionStore {
    cache: Arc<dyn Cache>,
    key_prefix: String,
}

impl CacheSessionStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            key_prefix: "session:".to_string(),
        }
    }

    fn session_key(&self, id: Uuid) -> String {
        format!("{}{}", self.key_prefix, id)
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn create_session(&self, session: Session) -> StoreResult<Uuid> {
        let id = session.id;
        let key = self.session_key(id);
        let ttl = session.ttl();

        self.cache
            .set_json(&key, &session, ttl)
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))?;
        Ok(id)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let key = self.session_key(id);

        let session: Option<Session> = self
            .cache
            .get_json(&key)
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))?;

        // The TTL should handle this, but clocks and cache backends differ.
        if let Some(ref s) = session
            && s.is_expired()
        {
            self.delete_session(id).await?;
            return Ok(None);
        }

        Ok(session)
    }

    async fn update_session(&self, session: Session) -> StoreResult<()> {
        let key = self.session_key(session.id);
        let ttl = session.ttl();

        self.cache
            .set_json(&key, &session, ttl)
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        let key = self.session_key(id);
        self.cache
            .delete(&key)
            .await
            .map_err(|e| StoreError::Cache(e.to_string()))
    }
}

/// Create a session store from the optional shared cache.
///
/// With a cache configured the sessions live there (shared across nodes when
/// the cache is Redis); otherwise an in-process store is used.
pub fn create_session_store(cache: Option<Arc<dyn Cache>>) -> Arc<dyn SessionStore> {
    match cache {
        Some(cache) => {
            tracing::info!("Using cache-backed session store");
            Arc::new(CacheSessionStore::new(cache))
        }
        None => {
            tracing::warn!(
                "Using in-process session store. Sessions will be lost on restart \
                 and not shared across nodes."
            );
            Arc::new(MemorySessionStore::new())
        }
    }
}
