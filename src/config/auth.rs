use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Authentication configuration: the OAuth2 provider endpoints, the session
/// cookie, the redirect-state store backend, and the path policies the two
/// gate middlewares enforce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// OAuth2 provider endpoints and client credentials.
    pub oauth2: Oauth2Config,

    /// Session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Redirect-state store configuration.
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Update an existing user's attributes from the freshly upserted
    /// provider profile on login. Newly created users are never reconciled;
    /// they are already seeded from the same profile.
    #[serde(default)]
    pub reconcile_users_on_login: bool,

    /// Ordered path rules for the session (cookie) flow. First match wins;
    /// a request whose path matches no rule is a configuration error.
    #[serde(default)]
    pub session_paths: Vec<PathRuleConfig>,

    /// Ordered path rules for the stateless bearer flow.
    #[serde(default)]
    pub bearer_paths: Vec<PathRuleConfig>,
}

impl AuthConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.oauth2.validate()?;
        self.state_store.validate()?;

        if self.session_paths.is_empty() && self.bearer_paths.is_empty() {
            return Err(ConfigError::Validation(
                "At least one of auth.session_paths or auth.bearer_paths must be configured".into(),
            ));
        }
        for rule in self.session_paths.iter().chain(&self.bearer_paths) {
            rule.validate()?;
        }
        Ok(())
    }
}

/// OAuth2 provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Oauth2Config {
    /// Authorization endpoint (browser redirect target).
    pub authorize_url: String,

    /// Token endpoint (code exchange and refresh).
    pub token_url: String,

    /// Profile endpoint (bearer-token-to-profile lookup).
    pub profile_url: String,

    /// Client ID.
    pub client_id: String,

    /// Client secret.
    pub client_secret: String,

    /// Scopes to request.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Path of the authorization callback route.
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

impl std::fmt::Debug for Oauth2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oauth2Config")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("profile_url", &self.profile_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"****")
            .field("scopes", &self.scopes)
            .field("callback_path", &self.callback_path)
            .finish()
    }
}

impl Oauth2Config {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("auth.oauth2.authorize_url", &self.authorize_url),
            ("auth.oauth2.token_url", &self.token_url),
            ("auth.oauth2.profile_url", &self.profile_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ConfigError::Validation(format!("{} is not a valid URL: {}", name, e))
            })?;
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::Validation(
                "OAuth2 client_id cannot be empty".into(),
            ));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::Validation(
                "OAuth2 client_secret cannot be empty".into(),
            ));
        }
        if !self.callback_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "auth.oauth2.callback_path must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

fn default_scopes() -> Vec<String> {
    vec!["openid".into(), "email".into(), "profile".into()]
}

fn default_callback_path() -> String {
    "/oauth2/callback".to_string()
}

/// Session cookie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name.
    #[serde(default = "default_session_cookie")]
    pub cookie_name: String,

    /// Session duration in seconds.
    #[serde(default = "default_session_duration")]
    pub duration_secs: u64,

    /// Secure cookie (HTTPS only).
    #[serde(default = "default_true")]
    pub secure: bool,

    /// SameSite cookie attribute.
    #[serde(default)]
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie(),
            duration_secs: default_session_duration(),
            secure: default_true(),
            same_site: SameSite::default(),
        }
    }
}

fn default_session_cookie() -> String {
    "portcullis_session".to_string()
}

fn default_session_duration() -> u64 {
    28800 // 8 hours
}

fn default_true() -> bool {
    true
}

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// Redirect-state store configuration.
///
/// The backend is selected explicitly, never inferred from the presence of
/// other configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateStoreConfig {
    /// Which backend holds pending redirect state.
    #[serde(default)]
    pub backend: StateStoreBackend,

    /// TTL for cache-backed state entries in seconds. Entries that expire
    /// before the callback arrives surface as stale state.
    #[serde(default = "default_state_ttl")]
    pub ttl_secs: u64,

    /// Cache key prefix for cache-backed state entries.
    #[serde(default = "default_state_key_prefix")]
    pub key_prefix: String,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            backend: StateStoreBackend::default(),
            ttl_secs: default_state_ttl(),
            key_prefix: default_state_key_prefix(),
        }
    }
}

impl StateStoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "auth.state_store.ttl_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Redirect-state store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StateStoreBackend {
    /// Embed pending redirects in the user's session record. No extra
    /// store, but ties state to cookie presence.
    #[default]
    Session,

    /// Store pending redirects in the shared cache with a TTL.
    Cache,
}

fn default_state_ttl() -> u64 {
    600 // 10 minutes
}

fn default_state_key_prefix() -> String {
    "authstate:".to_string()
}

/// One path rule: the first rule whose pattern matches the request path
/// governs the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathRuleConfig {
    /// Regular expression matched against the request path.
    pub pattern: String,

    /// Pass the request through without requiring authentication.
    #[serde(default)]
    pub whitelist: bool,

    /// Reject unauthenticated requests immediately instead of redirecting.
    #[serde(default)]
    pub fail_fast: bool,
}

impl PathRuleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        regex::Regex::new(&self.pattern).map_err(|e| {
            ConfigError::Validation(format!("Invalid path pattern '{}': {}", self.pattern, e))
        })?;
        Ok(())
    }
}
