//! Configuration module for the gateway.
//!
//! The gateway is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [auth.oauth2]
//! authorize_url = "https://idp.example.com/authorize"
//! token_url = "https://idp.example.com/oauth/token"
//! profile_url = "https://idp.example.com/userinfo"
//! client_id = "portcullis"
//! client_secret = "${OAUTH2_CLIENT_SECRET}"
//!
//! [[auth.session_paths]]
//! pattern = "^/public/.*"
//! whitelist = true
//!
//! [[auth.session_paths]]
//! pattern = "^/.*"
//! ```

mod auth;
mod cache;
mod database;
mod observability;
mod server;

use std::path::Path;

pub use auth::*;
pub use cache::*;
pub use database::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration for user and profile persistence.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cache configuration for session data and pending redirect state.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Authentication configuration.
    pub auth: AuthConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: GatewayConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        // User resolution needs somewhere to put users.
        if self.database.is_none() {
            return Err(ConfigError::Validation(
                "Authentication requires a database configuration \
                 (set database.type to \"memory\" or \"postgres\")"
                    .into(),
            ));
        }

        // A cache-backed state store without a cache has nowhere to put state.
        if self.auth.state_store.backend == StateStoreBackend::Cache && self.cache.is_none() {
            return Err(ConfigError::Validation(
                "auth.state_store.backend = \"cache\" requires a cache configuration".into(),
            ));
        }

        self.server.validate()?;
        self.database.validate()?;
        self.cache.validate()?;
        self.auth.validate()?;

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR_NAME}` references against the process environment.
fn expand_env_vars(contents: &str) -> Result<String, ConfigError> {
    let pattern = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("env var pattern is valid");

    let mut missing: Option<String> = None;
    let expanded = pattern.replace_all(contents, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::EnvVarNotFound(name)),
        None => Ok(expanded.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [database]
        type = "memory"

        [auth.oauth2]
        authorize_url = "https://idp.example.com/authorize"
        token_url = "https://idp.example.com/oauth/token"
        profile_url = "https://idp.example.com/userinfo"
        client_id = "portcullis"
        client_secret = "shh"

        [[auth.session_paths]]
        pattern = "^/.*"
    "#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config = GatewayConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.oauth2.callback_path, "/oauth2/callback");
        assert_eq!(
            config.auth.oauth2.scopes,
            vec!["openid", "email", "profile"]
        );
        assert_eq!(config.auth.state_store.backend, StateStoreBackend::Session);
        assert_eq!(config.auth.session.cookie_name, "portcullis_session");
        assert!(!config.auth.reconcile_users_on_login);
    }

    #[test]
    fn missing_database_is_rejected() {
        let without_db = MINIMAL.replace("[database]\n        type = \"memory\"", "");
        let err = GatewayConfig::from_toml_str(&without_db).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn cache_state_store_requires_cache() {
        let contents = format!(
            "{}\n[auth.state_store]\nbackend = \"cache\"\n",
            MINIMAL
        );
        let err = GatewayConfig::from_toml_str(&contents).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn invalid_path_pattern_is_rejected() {
        let contents = MINIMAL.replace("^/.*", "^/(unclosed");
        let err = GatewayConfig::from_toml_str(&contents).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let contents = format!("{}\nnot_a_real_key = true\n", MINIMAL);
        assert!(GatewayConfig::from_toml_str(&contents).is_err());
    }

    #[test]
    fn env_vars_are_expanded() {
        // Safety: test-only env mutation, no concurrent readers of this var.
        unsafe { std::env::set_var("PORTCULLIS_TEST_SECRET", "from-env") };
        let contents = MINIMAL.replace("\"shh\"", "\"${PORTCULLIS_TEST_SECRET}\"");
        let config = GatewayConfig::from_toml_str(&contents).unwrap();
        assert_eq!(config.auth.oauth2.client_secret, "from-env");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let contents = MINIMAL.replace("\"shh\"", "\"${PORTCULLIS_TEST_NO_SUCH_VAR}\"");
        let err = GatewayConfig::from_toml_str(&contents).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(_)));
    }

    #[test]
    fn config_loads_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.auth.oauth2.client_id, "portcullis");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = GatewayConfig::from_file("/no/such/portcullis.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn client_secret_is_masked_in_debug() {
        let config = GatewayConfig::from_toml_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config.auth.oauth2);
        assert!(debug.contains("****"));
        assert!(!debug.contains("shh"));
    }
}
