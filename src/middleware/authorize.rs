//! Session-flow gatekeeper.
//!
//! Classifies each request against the session path policy and either
//! passes it through, rejects it, or redirects the browser to the provider
//! with a freshly stored state key. The per-request identity is attached
//! before any policy outcome so whitelisted handlers still see a logged-in
//! user when one exists.

use axum::{
    body::Body,
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::{
    Cookie, Cookies,
    cookie::{SameSite as CookieSameSite, time::Duration as CookieDuration},
};
use uuid::Uuid;

use super::forwarded::forwarded_base_url;
use crate::{
    AppState,
    auth::{AuthError, RequestIdentity, Session, load_valid_session},
    config::{SameSite, SessionConfig},
};

/// Plain 302 redirect. `axum::response::Redirect` emits 303/307/308; the
/// authorize round-trip conventionally uses 302.
pub(crate) fn redirect_found(location: &str) -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(http::header::LOCATION, location)
        .body(Body::empty())
        .unwrap()
}

/// Build the session cookie with the configured security attributes.
pub(crate) fn build_session_cookie(config: &SessionConfig, session_id: Uuid) -> Cookie<'static> {
    let same_site = match config.same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    };
    Cookie::build((config.cookie_name.clone(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site)
        .max_age(CookieDuration::seconds(config.duration_secs as i64))
        .build()
}

/// Load the request's session from its cookie, if present and still valid.
pub(crate) async fn load_session_from_cookie(
    state: &AppState,
    cookies: &Cookies,
) -> Result<Option<Session>, AuthError> {
    let session_config = &state.config.auth.session;

    let Some(cookie) = cookies.get(&session_config.cookie_name) else {
        return Ok(None);
    };
    let Ok(session_id) = cookie.value().parse::<Uuid>() else {
        return Ok(None);
    };

    Ok(load_valid_session(state.sessions.as_ref(), session_id).await?)
}

pub async fn authorize_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    let Some(rule) = state.session_policy.match_path(&path).cloned() else {
        let err = AuthError::UnmatchedPath(path);
        tracing::error!(error = %err, "Path policy misconfiguration");
        return err.into_response();
    };

    let Some(cookies) = req.extensions().get::<Cookies>().cloned() else {
        return AuthError::Internal("cookie layer not installed".into()).into_response();
    };

    let loaded = match load_session_from_cookie(&state, &cookies).await {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::error!(error = %err, "Failed to load session");
            return err.into_response();
        }
    };
    let is_new = loaded.is_none();
    let mut session =
        loaded.unwrap_or_else(|| Session::new(state.config.auth.session.duration_secs));

    // Attached unconditionally: whitelisted paths still get a working
    // identity for a logged-in user.
    let identity =
        RequestIdentity::for_session(&session, state.sessions.clone(), state.provider.clone());
    req.extensions_mut().insert(identity.clone());

    if rule.whitelist {
        return next.run(req).await;
    }

    let user_id = identity.logged_in_user_id();
    if rule.fail_fast {
        if user_id.is_none() {
            tracing::debug!(path = %path, "Rejecting unauthenticated request on fail-fast path");
            return AuthError::NotLoggedIn.into_response();
        }
        return next.run(req).await;
    }
    if user_id.is_some() {
        return next.run(req).await;
    }

    // Unauthenticated browser request: stash the intent, send the user to
    // the provider. The request-derived values are computed here so the
    // redirect future does not hold a (non-`Send`) `&Request` across its
    // awaits.
    let base_url = forwarded_base_url(req.headers(), &state.config.server);
    let original_uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.to_string())
        .unwrap_or_else(|| req.uri().to_string());
    let ui_locales = req.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "ui_locales")
            .map(|(_, value)| value.into_owned())
    });

    match authorize_redirect(
        &state,
        &mut session,
        is_new,
        &cookies,
        base_url,
        original_uri,
        ui_locales,
    )
    .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "Failed to start authorization redirect");
            err.into_response()
        }
    }
}

async fn authorize_redirect(
    state: &AppState,
    session: &mut Session,
    is_new: bool,
    cookies: &Cookies,
    base_url: String,
    original_uri: String,
    ui_locales: Option<String>,
) -> Result<Response, AuthError> {
    let state_key = Uuid::new_v4().to_string();
    state
        .state_store
        .set(session, &state_key, &format!("{}{}", base_url, original_uri))
        .await?;

    // Persist the session before redirecting: the pending redirect may live
    // inside it, and the cookie has to reach the browser either way.
    if is_new {
        state.sessions.create_session(session.clone()).await?;
    } else {
        state.sessions.update_session(session.clone()).await?;
    }
    cookies.add(build_session_cookie(&state.config.auth.session, session.id));

    let redirect_uri = format!("{}{}", base_url, state.provider.callback_path());
    let authorize_url =
        state
            .provider
            .authorize_url(&state_key, &redirect_uri, ui_locales.as_deref())?;

    tracing::debug!(url = %authorize_url, original_uri = %original_uri, "Sending authorization redirect");
    Ok(redirect_found(&authorize_url))
}
