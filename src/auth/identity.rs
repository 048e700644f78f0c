//! Per-request identity context.
//!
//! Downstream handlers read the authenticated principal and obtain a usable
//! access token through this value instead of closures stashed on a mutable
//! request object. It is constructed once per request by the gate
//! middlewares and attached as an axum extension.

use std::sync::Arc;

use uuid::Uuid;

use super::{
    AuthError,
    client::ProviderClient,
    session::{Session, SessionStore, SessionUser, load_valid_session},
};

/// Identity of the current request, attached as a request extension.
#[derive(Clone)]
pub struct RequestIdentity {
    inner: Arc<IdentityInner>,
}

enum IdentityInner {
    /// Cookie-session flow: tokens live in the session record and are
    /// refreshed on demand.
    Session {
        session_id: Uuid,
        user_id: Option<Uuid>,
        sessions: Arc<dyn SessionStore>,
        client: Arc<ProviderClient>,
    },

    /// Stateless bearer flow: the presented token, verbatim. No refresh
    /// channel exists; bearer clients manage their own token lifecycle.
    Bearer {
        user_id: Option<Uuid>,
        token: Option<String>,
    },
}

impl RequestIdentity {
    /// Identity for a session-flow request.
    pub fn for_session(
        session: &Session,
        sessions: Arc<dyn SessionStore>,
        client: Arc<ProviderClient>,
    ) -> Self {
        Self {
            inner: Arc::new(IdentityInner::Session {
                session_id: session.id,
                user_id: session.user.as_ref().map(|u| u.user_id),
                sessions,
                client,
            }),
        }
    }

    /// Identity for a bearer-flow request.
    pub fn for_bearer(user_id: Option<Uuid>, token: Option<String>) -> Self {
        Self {
            inner: Arc::new(IdentityInner::Bearer { user_id, token }),
        }
    }

    /// Local user id of the authenticated principal, if any.
    pub fn logged_in_user_id(&self) -> Option<Uuid> {
        match self.inner.as_ref() {
            IdentityInner::Session { user_id, .. } => *user_id,
            IdentityInner::Bearer { user_id, .. } => *user_id,
        }
    }

    /// Current provider access token.
    ///
    /// Session flow: returns the stored token unless it is missing or past
    /// expiry, in which case a refresh is attempted with the stored refresh
    /// token; a successful refresh overwrites the session record. Without a
    /// refresh token the stored token fields are cleared (forcing a future
    /// full re-authorization) and `None` is returned. Refresh failures
    /// propagate to the caller; they are not swallowed.
    ///
    /// Bearer flow: the presented token, verbatim.
    pub async fn access_token(&self) -> Result<Option<String>, AuthError> {
        match self.inner.as_ref() {
            IdentityInner::Bearer { token, .. } => Ok(token.clone()),
            IdentityInner::Session {
                session_id,
                sessions,
                client,
                ..
            } => {
                let Some(mut session) = load_valid_session(sessions.as_ref(), *session_id).await?
                else {
                    return Ok(None);
                };
                let Some(user) = session.user.clone() else {
                    return Ok(None);
                };

                if !user.needs_refresh() {
                    return Ok(user.access_token);
                }

                if let Some(refresh_token) = &user.refresh_token {
                    let tokens = client.refresh_token(refresh_token).await?;
                    let refreshed = SessionUser::from_tokens(user.user_id, &tokens);
                    let access_token = refreshed.access_token.clone();

                    session.user = Some(refreshed);
                    sessions.update_session(session).await?;
                    return Ok(access_token);
                }

                // No refresh channel left: clear the token fields so the
                // next gate pass triggers a full re-authorization.
                session.user = Some(SessionUser::cleared(user.user_id));
                sessions.update_session(session).await?;
                Ok(None)
            }
        }
    }
}
