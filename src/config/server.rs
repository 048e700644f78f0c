use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible base URL (e.g. `https://app.example.com`).
    ///
    /// When set, this overrides base-URL reconstruction from forwarded
    /// headers. Required when the gateway sits behind a proxy that does not
    /// send `x-forwarded-*` headers.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Prefix inserted after `x-` in forwarded header names. Some proxies
    /// namespace their headers, e.g. a prefix of `"my-"` reads
    /// `x-my-forwarded-proto` / `x-my-forwarded-host` / `x-my-forwarded-port`.
    #[serde(default)]
    pub forwarded_header_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
            forwarded_header_prefix: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.public_base_url {
            let parsed = url::Url::parse(base).map_err(|e| {
                ConfigError::Validation(format!("server.public_base_url is not a valid URL: {}", e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(
                    "server.public_base_url must be an http(s) URL".into(),
                ));
            }
            if base.ends_with('/') {
                return Err(ConfigError::Validation(
                    "server.public_base_url must not end with a trailing slash".into(),
                ));
            }
        }
        Ok(())
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8080
}
