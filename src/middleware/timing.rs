//! Request-timing middleware.
//!
//! Logs a `started` line when a request arrives and a `completed in N ms`
//! line when the response is ready, both at debug level. The Cookie header
//! is only echoed when `observability.logging.log_cookies` is enabled.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

pub async fn timing_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    if state.config.observability.logging.log_cookies
        && let Some(cookie) = req
            .headers()
            .get(http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
    {
        tracing::debug!(%method, %uri, cookie = %cookie, "Request started");
    } else {
        tracing::debug!(%method, %uri, "Request started");
    }

    let started = Instant::now();
    let response = next.run(req).await;

    tracing::debug!(
        %method,
        %uri,
        status = %response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
