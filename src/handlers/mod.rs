// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers, one submodule per dashboard resource.
//
// Every admin handler follows the same shape:
//   1. pull the caller's bearer token (401 without a backend call if absent)
//   2. validate the request with `rules`
//   3. call the store backend through `StoreClient`
//   4. record request metrics and return JSON (or a structured error)
// =============================================================================

pub mod auth;
pub mod categories;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod products;
pub mod uploads;
pub mod users;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{HealthResponse, ReadinessChecks, ReadinessResponse};
use crate::AppState;

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "store-admin-gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe: the store backend answers and Redis responds to PING
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let (store_api, redis) = tokio::join!(state.client.health_check(), state.cache.ping());

    let all_healthy = store_api && redis;
    let status = if all_healthy { "ready" } else { "not_ready" };

    let response = ReadinessResponse {
        status: status.to_string(),
        checks: ReadinessChecks { store_api, redis },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        tracing::warn!(store_api, redis, "Readiness check failed");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

// =============================================================================
// METRICS ENDPOINT
// =============================================================================
/// Prometheus metrics in text exposition format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Extract the caller's token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> AppResult<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized(
            "Malformed authorization header".to_string(),
        ));
    }

    Ok(token.to_string())
}

/// Record a finished request, answering 200 on success
pub fn observe<T>(
    method: &str,
    endpoint: &str,
    start: Instant,
    result: AppResult<T>,
) -> AppResult<T> {
    observe_with(method, endpoint, start, StatusCode::OK, result)
}

/// Record a finished request with an explicit success status
pub fn observe_with<T>(
    method: &str,
    endpoint: &str,
    start: Instant,
    success: StatusCode,
    result: AppResult<T>,
) -> AppResult<T> {
    let status = match &result {
        Ok(_) => success,
        Err(err) => err.status(),
    };
    metrics::record_http_request(
        method,
        endpoint,
        status.as_u16(),
        start.elapsed().as_secs_f64(),
    );
    result
}
