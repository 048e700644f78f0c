use std::{fmt, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Authentication flow errors.
///
/// Callback-time and bearer-time failures are routed through an
/// [`ErrorHandler`] so one place decides the HTTP response; the
/// `IntoResponse` impl below provides the standalone mapping for errors that
/// surface outside a handler (the gate middlewares).
#[derive(Debug)]
pub enum AuthError {
    /// Provider returned `error` on the authorization callback.
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    /// Callback arrived without an authorization code.
    MissingCode,

    /// No pending redirect state matches the callback's state key.
    /// Stale, expired, or replayed — all indistinguishable by design.
    StaleState { state_key: String },

    /// Code exchange or refresh call failed, or the response carried no
    /// access token.
    TokenExchange(String),

    /// Profile download failed.
    ProfileFetch(String),

    /// Bearer flow: no token supplied on a non-whitelisted path.
    MissingToken,

    /// Session flow: fail-fast path without an authenticated session.
    NotLoggedIn,

    /// No path rule matches the request path. A deployment
    /// misconfiguration, never defaulted to allow or deny.
    UnmatchedPath(String),

    /// Session or redirect-state store failure.
    Store(String),

    /// Internal error during authentication.
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::ProviderDenied { .. }
            | AuthError::MissingCode
            | AuthError::StaleState { .. }
            | AuthError::TokenExchange(_)
            | AuthError::ProfileFetch(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingToken | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            AuthError::UnmatchedPath(_) | AuthError::Store(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match &self {
            AuthError::NotLoggedIn => "not logged in",
            _ => "Error",
        };

        (status, body).into_response()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ProviderDenied { error, description } => match description {
                Some(description) => {
                    write!(f, "Provider denied authorization: {} - {}", error, description)
                }
                None => write!(f, "Provider denied authorization: {}", error),
            },
            AuthError::MissingCode => write!(f, "No code supplied"),
            AuthError::StaleState { state_key } => {
                write!(f, "No state found: key={}", state_key)
            }
            AuthError::TokenExchange(msg) => write!(f, "Token exchange failed: {}", msg),
            AuthError::ProfileFetch(msg) => write!(f, "Profile download failed: {}", msg),
            AuthError::MissingToken => write!(f, "No bearer/access token supplied"),
            AuthError::NotLoggedIn => write!(f, "Not logged in"),
            AuthError::UnmatchedPath(path) => {
                write!(f, "No matching auth path config found at {}", path)
            }
            AuthError::Store(msg) => write!(f, "Store error: {}", msg),
            AuthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<super::session::StoreError> for AuthError {
    fn from(e: super::session::StoreError) -> Self {
        AuthError::Store(e.to_string())
    }
}

impl From<crate::db::DbError> for AuthError {
    fn from(e: crate::db::DbError) -> Self {
        AuthError::Store(e.to_string())
    }
}

/// Decides the HTTP response for a failed callback or bearer authentication.
pub type ErrorHandler = Arc<dyn Fn(&AuthError) -> Response + Send + Sync>;

/// Build an error handler answering a fixed status with body `"Error"`.
///
/// The defaults are 400 for callback failures and 401 for bearer failures.
pub fn default_error_handler(status: StatusCode) -> ErrorHandler {
    Arc::new(move |err| {
        tracing::error!(status = %status.as_u16(), error = %err, "Authentication error");
        (status, "Error").into_response()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_errors_are_400() {
        for err in [
            AuthError::ProviderDenied {
                error: "access_denied".into(),
                description: None,
            },
            AuthError::MissingCode,
            AuthError::StaleState {
                state_key: "abc".into(),
            },
            AuthError::TokenExchange("boom".into()),
            AuthError::ProfileFetch("boom".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn credential_errors_are_401() {
        assert_eq!(
            AuthError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::NotLoggedIn.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unmatched_path_is_500() {
        let err = AuthError::UnmatchedPath("/nowhere".into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn default_handler_uses_configured_status() {
        let handler = default_error_handler(StatusCode::IM_A_TEAPOT);
        let response = handler(&AuthError::MissingCode);
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
