//! Client for the identity provider's token and profile endpoints.
//!
//! Three outbound calls: code-for-token exchange, refresh-token exchange,
//! and bearer-token-to-profile lookup, plus the builder for the browser
//! authorize redirect. All calls are side-effect-free with respect to local
//! state; they never retry and never cache.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use super::AuthError;
use crate::{config::Oauth2Config, models::Profile};

/// Token response from the provider's token endpoint.
///
/// `access_token` stays optional here: providers report failures in the
/// body, and the client does not judge the response. Callers check for a
/// present token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,

    #[serde(default)]
    pub id_token: Option<String>,
}

/// Client for the configured OAuth2 provider.
pub struct ProviderClient {
    config: Arc<Oauth2Config>,
    http_client: reqwest::Client,
}

impl ProviderClient {
    pub fn new(config: Arc<Oauth2Config>, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn callback_path(&self) -> &str {
        &self.config.callback_path
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token exchange request failed");
                AuthError::TokenExchange(e.to_string())
            })?;

        // The token endpoint reports failures in the JSON body; the status
        // code is not authoritative here.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
        tracing::debug!(status = %status, "Token exchange response received");

        serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenExchange(format!("unparseable token response: {}", e)))
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token refresh request failed");
                AuthError::TokenExchange(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
        tracing::debug!(status = %status, "Token refresh response received");

        serde_json::from_str(&body)
            .map_err(|e| AuthError::TokenExchange(format!("unparseable token response: {}", e)))
    }

    /// Download the profile asserted by a bearer token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Profile, AuthError> {
        let response = self
            .http_client
            .get(&self.config.profile_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Profile request failed");
                AuthError::ProfileFetch(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))?;
        tracing::debug!(status = %status, "Profile response received");

        serde_json::from_str(&body)
            .map_err(|e| AuthError::ProfileFetch(format!("unparseable profile: {}", e)))
    }

    /// Build the browser redirect target for the authorization endpoint.
    ///
    /// `ui_locales` is passed through verbatim when the original request
    /// carried one (some providers localize their login page with it).
    pub fn authorize_url(
        &self,
        state_key: &str,
        redirect_uri: &str,
        ui_locales: Option<&str>,
    ) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::Internal(format!("invalid authorize URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", redirect_uri);
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", state_key);
            if let Some(locales) = ui_locales {
                query.append_pair("ui_locales", locales);
            }
        }

        Ok(url.to_string())
    }
}
