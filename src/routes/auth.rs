//! Authentication routes.
//!
//! - `GET {callback_path}` — handles the provider's authorization callback
//! - `GET /whoami` — returns the current identity

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthError, RequestIdentity, Session, SessionUser},
    middleware::{build_session_cookie, forwarded_base_url, load_session_from_cookie, redirect_found},
};

/// Query parameters for the callback endpoint.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code from the provider.
    #[serde(default)]
    pub code: Option<String>,

    /// State parameter binding this callback to its pending attempt.
    pub state: String,

    /// Error from the provider (if any).
    #[serde(default)]
    pub error: Option<String>,

    /// Error description from the provider.
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Callback endpoint — completes the authorization-code flow.
///
/// Every failure in the flow routes to the configured callback error
/// handler, which decides the HTTP response; nothing bubbles to a generic
/// framework handler.
#[tracing::instrument(name = "auth.callback", skip(state, cookies, headers, query))]
pub async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: http::HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match run_callback(&state, &cookies, &headers, &query).await {
        Ok(response) => response,
        Err(err) => (state.callback_error_handler)(&err),
    }
}

async fn run_callback(
    state: &AppState,
    cookies: &Cookies,
    headers: &http::HeaderMap,
    query: &CallbackQuery,
) -> Result<Response, AuthError> {
    tracing::debug!(
        has_code = query.code.is_some(),
        state = %query.state,
        error = ?query.error,
        "Authorization callback"
    );

    if let Some(error) = &query.error {
        return Err(AuthError::ProviderDenied {
            error: error.clone(),
            description: query.error_description.clone(),
        });
    }
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Err(AuthError::MissingCode);
    };

    let loaded = load_session_from_cookie(state, cookies).await?;
    let is_new = loaded.is_none();
    let mut session =
        loaded.unwrap_or_else(|| Session::new(state.config.auth.session.duration_secs));

    // CSRF guard: a callback without a matching stored state never reaches
    // the provider. Stale, expired, and replayed states all land here.
    let original_url = state
        .state_store
        .get(&session, &query.state)
        .await?
        .ok_or_else(|| AuthError::StaleState {
            state_key: query.state.clone(),
        })?;

    let base_url = forwarded_base_url(headers, &state.config.server);
    let redirect_uri = format!("{}{}", base_url, state.provider.callback_path());

    let tokens = state.provider.exchange_code(code, &redirect_uri).await?;
    let access_token = match tokens.access_token.as_deref() {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => return Err(AuthError::TokenExchange("no access token in response".into())),
    };

    // Single use: consume the state before anything else succeeds.
    state.state_store.del(&mut session, &query.state).await?;

    let profile = state.provider.fetch_profile(&access_token).await?;
    let user_id = state.resolver.resolve_or_create_user(&profile).await?;

    session.user = Some(SessionUser::from_tokens(user_id, &tokens));
    if is_new {
        state.sessions.create_session(session.clone()).await?;
    } else {
        state.sessions.update_session(session.clone()).await?;
    }
    cookies.add(build_session_cookie(
        &state.config.auth.session,
        session.id,
    ));

    tracing::info!(
        user_id = %user_id,
        session_id = %session.id,
        "Authorization callback succeeded"
    );

    let target = if original_url.is_empty() {
        "/".to_string()
    } else {
        original_url
    };
    tracing::debug!(url = %target, "Redirecting to original URL");
    Ok(redirect_found(&target))
}

/// Response for the whoami endpoint.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

/// Current identity of the request.
#[tracing::instrument(name = "auth.whoami", skip(identity))]
pub async fn whoami(Extension(identity): Extension<RequestIdentity>) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        user_id: identity.logged_in_user_id(),
    })
}
