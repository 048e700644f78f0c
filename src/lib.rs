//! Portcullis: an OAuth2 authorization-code front-door for HTTP services.
//!
//! The gateway intercepts unauthenticated requests, drives the identity
//! provider's authorize/token/refresh/profile endpoints, binds the result to
//! a local user, and attaches a reusable access-token accessor to every
//! authenticated request. Two gate middlewares cover the two client shapes:
//! a cookie-session flow for browsers and a stateless bearer flow for APIs.

use std::sync::Arc;

use axum::{Router, routing::get};
use http::StatusCode;
use tower_cookies::CookieManagerLayer;

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;

#[cfg(test)]
mod tests;

/// Shared application state.
///
/// Every store and client is constructed explicitly at startup and injected
/// here; there is no lazy first-use initialization and no module-global
/// connection state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::GatewayConfig>,
    pub http_client: reqwest::Client,
    pub db: Arc<db::DbPool>,
    pub cache: Option<Arc<dyn cache::Cache>>,
    pub provider: Arc<auth::ProviderClient>,
    pub sessions: Arc<dyn auth::SessionStore>,
    pub state_store: Arc<dyn auth::RedirectStateStore>,
    pub resolver: Arc<auth::UserResolver>,
    pub session_policy: Arc<auth::PathPolicy>,
    pub bearer_policy: Arc<auth::PathPolicy>,
    /// Decides the HTTP response for callback failures. Default: 400.
    pub callback_error_handler: auth::ErrorHandler,
    /// Decides the HTTP response for bearer failures. Default: 401.
    pub auth_error_handler: auth::ErrorHandler,
}

impl AppState {
    pub async fn new(config: config::GatewayConfig) -> Result<Self, Box<dyn std::error::Error>> {
        // One shared HTTP client for all outbound provider requests;
        // reqwest pools connections per host internally.
        let http_client = reqwest::Client::new();

        let cache: Option<Arc<dyn cache::Cache>> = match &config.cache {
            config::CacheConfig::None => None,
            config::CacheConfig::Memory(cfg) => Some(Arc::new(cache::MemoryCache::new(cfg))),
            #[allow(unused_variables)]
            config::CacheConfig::Redis(cfg) => {
                #[cfg(feature = "redis")]
                {
                    Some(Arc::new(cache::RedisCache::from_config(cfg).await?))
                }
                #[cfg(not(feature = "redis"))]
                {
                    return Err("Redis cache configured but 'redis' feature not enabled. \
                        Rebuild with: cargo build --features redis"
                        .into());
                }
            }
        };

        let db = Arc::new(db::DbPool::from_config(&config.database).await?);
        db.run_migrations().await?;

        let provider = Arc::new(auth::ProviderClient::new(
            Arc::new(config.auth.oauth2.clone()),
            http_client.clone(),
        ));
        let sessions = auth::create_session_store(cache.clone());
        let state_store = auth::create_state_store(&config.auth.state_store, cache.clone())?;
        let resolver = Arc::new(auth::UserResolver::new(
            db.users(),
            db.oauth_profiles(),
            config.auth.reconcile_users_on_login,
        ));
        let session_policy = Arc::new(auth::PathPolicy::from_config(&config.auth.session_paths)?);
        let bearer_policy = Arc::new(auth::PathPolicy::from_config(&config.auth.bearer_paths)?);

        Ok(Self {
            config: Arc::new(config),
            http_client,
            db,
            cache,
            provider,
            sessions,
            state_store,
            resolver,
            session_policy,
            bearer_policy,
            callback_error_handler: auth::default_error_handler(StatusCode::BAD_REQUEST),
            auth_error_handler: auth::default_error_handler(StatusCode::UNAUTHORIZED),
        })
    }

    /// Replace the handler deciding HTTP responses for callback failures.
    #[must_use]
    pub fn with_callback_error_handler(mut self, handler: auth::ErrorHandler) -> Self {
        self.callback_error_handler = handler;
        self
    }

    /// Replace the handler deciding HTTP responses for bearer failures.
    #[must_use]
    pub fn with_auth_error_handler(mut self, handler: auth::ErrorHandler) -> Self {
        self.auth_error_handler = handler;
        self
    }
}

/// Assemble the gateway router.
///
/// The callback and health routes are public; `/api/*` sits behind the
/// bearer gate; everything else sits behind the session gate, including a
/// fallback so unknown paths are still classified by the path policy rather
/// than skipped.
pub fn build_router(state: AppState) -> Router {
    let callback_path = state.config.auth.oauth2.callback_path.clone();

    let mut router = Router::new()
        .route(&callback_path, get(routes::auth::callback))
        .route("/health", get(routes::health::health_check));

    if !state.config.auth.bearer_paths.is_empty() {
        // The wildcard keeps unrouted /api paths behind the bearer gate
        // instead of letting them drop through to the session fallback.
        let api = Router::new()
            .route("/api/whoami", get(routes::auth::whoami))
            .route("/api/{*rest}", get(not_found))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::bearer_middleware,
            ));
        router = router.merge(api);
    }

    if !state.config.auth.session_paths.is_empty() {
        let protected = Router::new()
            .route("/whoami", get(routes::auth::whoami))
            .fallback(not_found)
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::authorize_middleware,
            ));
        router = router.merge(protected);
    }

    router
        .layer(CookieManagerLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::timing_middleware,
        ))
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
