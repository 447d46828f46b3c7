// =============================================================================
// ORDER HANDLERS
// =============================================================================
// Status changes are written to the backend only. The stock movement a new
// status implies is applied by the order sync, which sees the order on its
// next pass (or on a manual `POST /inventory/sync/orders`).
// =============================================================================

use axum::{
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::{bearer_token, observe};
use crate::error::{AppError, AppResult};
use crate::models::{ListResponse, Order, UpdateOrderStatusRequest};
use crate::rules;
use crate::AppState;

/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<Order>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_orders(&token, query.as_deref())
        .await
        .map_err(AppError::from);
    observe("GET", "/api/v1/orders", start, result).map(Json)
}

/// GET /api/v1/orders/stats
pub async fn order_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.order_stats(&token).await.map_err(AppError::from);
    observe("GET", "/api/v1/orders/stats", start, result).map(Json)
}

/// GET /api/v1/orders/:id
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.get_order(&token, &id).await.map_err(AppError::from);
    observe("GET", "/api/v1/orders/:id", start, result).map(Json)
}

/// PUT /api/v1/orders/:id/status
///
/// # Request Body
/// ```json
/// { "status": "shipped", "note": "DHL 12345" }
/// ```
/// Upper-case statuses (`SHIPPED`) are accepted too.
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<Order>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = async {
        rules::check_status_update(request.status)?;
        let order = state.client.update_order_status(&token, &id, &request).await?;
        Ok::<_, AppError>(order)
    }
    .await;

    if result.is_ok() {
        tracing::info!(
            order_id = %id,
            status = request.status.as_str(),
            moves_stock = rules::status_stock_effect(request.status).is_some(),
            "Order status updated"
        );
    }

    observe("PUT", "/api/v1/orders/:id/status", start, result).map(Json)
}
