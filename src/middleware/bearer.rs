//! Stateless bearer gatekeeper.
//!
//! Validates the presented bearer token against the provider on every
//! request and resolves the user inline; nothing is cached locally. The
//! trade is latency for statelessness.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::HeaderMap;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthError, RequestIdentity},
};

/// Extract the bearer token from the `Authorization` header.
///
/// Case-insensitive `Bearer` prefix, trimmed. Returns an empty string when
/// the header is absent or carries a different scheme.
fn extract_bearer_token(headers: &HeaderMap) -> String {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return String::new();
    };

    let value = value.trim();
    if value.len() >= 7 && value[..7].eq_ignore_ascii_case("bearer ") {
        value[7..].trim().to_string()
    } else {
        String::new()
    }
}

pub async fn bearer_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    let Some(rule) = state.bearer_policy.match_path(&path).cloned() else {
        let err = AuthError::UnmatchedPath(path);
        tracing::error!(error = %err, "Path policy misconfiguration");
        return err.into_response();
    };

    let token = extract_bearer_token(req.headers());

    if !rule.whitelist && token.is_empty() {
        return (state.auth_error_handler)(&AuthError::MissingToken);
    }

    // A presented token is resolved even on whitelisted paths, so the
    // downstream handler still sees the logged-in user.
    let identity = if token.is_empty() {
        RequestIdentity::for_bearer(None, None)
    } else {
        match resolve_bearer(&state, &token).await {
            Ok(user_id) => RequestIdentity::for_bearer(Some(user_id), Some(token)),
            Err(err) => return (state.auth_error_handler)(&err),
        }
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

async fn resolve_bearer(state: &AppState, token: &str) -> Result<Uuid, AuthError> {
    let profile = state.provider.fetch_profile(token).await?;
    let user_id = state.resolver.resolve_or_create_user(&profile).await?;
    Ok(user_id)
}
