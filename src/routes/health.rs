//! Health check endpoint for probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Service version
    pub version: String,
    /// Individual subsystem statuses
    pub subsystems: SubsystemStatus,
}

/// Status of individual subsystems.
#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    /// Database connection status
    pub database: ComponentStatus,
    /// Cache connection status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<ComponentStatus>,
}

/// Status of a single component.
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Full health check with subsystem status.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut overall_healthy = true;

    let start = std::time::Instant::now();
    let db_healthy = state.db.health_check().await.is_ok();
    if !db_healthy {
        overall_healthy = false;
    }
    let database = ComponentStatus {
        healthy: db_healthy,
        message: (!db_healthy).then(|| "Database connection failed".to_string()),
        latency_ms: start.elapsed().as_millis() as u64,
    };

    let cache = match &state.cache {
        Some(cache) => {
            let start = std::time::Instant::now();
            let cache_healthy = cache.ping().await.is_ok();
            if !cache_healthy {
                overall_healthy = false;
            }
            Some(ComponentStatus {
                healthy: cache_healthy,
                message: (!cache_healthy).then(|| "Cache connection failed".to_string()),
                latency_ms: start.elapsed().as_millis() as u64,
            })
        }
        None => None,
    };

    let status = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthStatus {
        status: if overall_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        subsystems: SubsystemStatus { database, cache },
    };

    (status, Json(body))
}
