// =============================================================================
// INVENTORY HANDLERS
// =============================================================================
// Stock page operations. Items leaving the gateway are annotated with the
// derived stock flags, and every stock read refreshes the level gauges.
//
// Manual adjustments are checked against the item's current quantity and
// its maximum stock level before the backend sees them.
// =============================================================================

use axum::{
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use super::{bearer_token, observe};
use crate::client::StoreClient;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    AdjustStockRequest, AdjustmentReason, BulkInventoryUpdate, InventoryItem, InventorySettings,
    ListResponse, StockAdjustment, SyncReport,
};
use crate::rules;
use crate::sync;
use crate::AppState;

/// Annotate an item and publish its stock level
fn publish(mut item: InventoryItem) -> InventoryItem {
    rules::annotate_item(&mut item);
    metrics::set_stock_level(&item.sku, &item.location.warehouse, item.quantity_available);
    item
}

// -----------------------------------------------------------------------------
// READS
// -----------------------------------------------------------------------------

/// GET /api/v1/inventory
pub async fn list_inventory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<InventoryItem>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_inventory(&token, query.as_deref())
        .await
        .map(|list| ListResponse {
            items: list.items.into_iter().map(publish).collect(),
            pagination: list.pagination,
        })
        .map_err(AppError::from);

    observe("GET", "/api/v1/inventory", start, result).map(Json)
}

/// GET /api/v1/inventory/:id
pub async fn get_inventory_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<InventoryItem>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .get_inventory_item(&token, &id)
        .await
        .map(publish)
        .map_err(AppError::from);

    observe("GET", "/api/v1/inventory/:id", start, result).map(Json)
}

/// GET /api/v1/inventory/low-stock
pub async fn low_stock_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .low_stock_items(&token)
        .await
        .map(|items| {
            metrics::set_low_stock_count(items.len());
            items.into_iter().map(publish).collect::<Vec<_>>()
        })
        .map_err(AppError::from);

    observe("GET", "/api/v1/inventory/low-stock", start, result).map(Json)
}

/// GET /api/v1/inventory/stats
pub async fn inventory_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.inventory_stats(&token).await.map_err(AppError::from);
    observe("GET", "/api/v1/inventory/stats", start, result).map(Json)
}

/// GET /api/v1/inventory/adjustment-reasons
pub async fn adjustment_reasons(headers: HeaderMap) -> AppResult<Json<Vec<&'static str>>> {
    bearer_token(&headers)?;
    Ok(Json(
        AdjustmentReason::ALL.iter().map(AdjustmentReason::label).collect(),
    ))
}

// -----------------------------------------------------------------------------
// WRITES
// -----------------------------------------------------------------------------

/// Check a manual adjustment against the live item and apply it
pub(crate) async fn apply_adjustment(
    client: &StoreClient,
    token: &str,
    id: &str,
    request: AdjustStockRequest,
) -> AppResult<InventoryItem> {
    let item = client.get_inventory_item(token, id).await?;
    let resulting = rules::check_adjustment(&item, request.adjustment)?;

    tracing::info!(
        inventory_id = %id,
        sku = %item.sku,
        delta = request.adjustment,
        resulting,
        reason = request.reason.label(),
        "Adjusting stock"
    );

    let adjustment = StockAdjustment {
        adjustment: request.adjustment,
        reason: request.reason.label().to_string(),
        notes: request
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    };

    match client.adjust_stock(token, id, &adjustment).await {
        Ok(updated) => {
            metrics::record_stock_adjustment("manual", true);
            let item = publish(updated);
            tracing::info!(
                inventory_id = %id,
                quantity = item.quantity_available,
                status = item.status.map(|s| s.label()).unwrap_or_default(),
                "Stock adjusted"
            );
            Ok(item)
        }
        Err(err) => {
            metrics::record_stock_adjustment("manual", false);
            Err(err.into())
        }
    }
}

/// POST /api/v1/inventory/:id/adjust
///
/// # Request Body
/// ```json
/// { "adjustment": -5, "reason": "Damaged Goods", "notes": "water damage" }
/// ```
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<AdjustStockRequest>,
) -> AppResult<Json<InventoryItem>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = apply_adjustment(&state.client, &token, &id, request).await;
    observe("POST", "/api/v1/inventory/:id/adjust", start, result).map(Json)
}

/// PUT /api/v1/inventory/:id
pub async fn update_inventory_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(settings): Json<InventorySettings>,
) -> AppResult<Json<InventoryItem>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = async {
        rules::validate_inventory_settings(&settings)?;
        let item = state.client.update_inventory_item(&token, &id, &settings).await?;
        tracing::info!(inventory_id = %id, "Inventory settings updated");
        Ok::<_, AppError>(publish(item))
    }
    .await;

    observe("PUT", "/api/v1/inventory/:id", start, result).map(Json)
}

/// Every entry must pass; one bad entry rejects the whole batch
pub(crate) fn validate_bulk(update: &BulkInventoryUpdate) -> AppResult<()> {
    if update.updates.is_empty() {
        return Err(AppError::BadRequest("No inventory updates given".to_string()));
    }

    for (index, entry) in update.updates.iter().enumerate() {
        rules::validate_inventory_settings(&entry.settings).map_err(|violation| {
            AppError::BadRequest(format!(
                "Update {} (item {}): {}",
                index + 1,
                entry.id,
                violation
            ))
        })?;
    }
    Ok(())
}

/// POST /api/v1/inventory/bulk-update
pub async fn bulk_update_inventory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<BulkInventoryUpdate>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = async {
        validate_bulk(&update)?;
        let summary = state.client.bulk_update_inventory(&token, &update).await?;
        tracing::info!(entries = update.updates.len(), "Bulk inventory update applied");
        Ok::<_, AppError>(summary)
    }
    .await;

    observe("POST", "/api/v1/inventory/bulk-update", start, result).map(Json)
}

// -----------------------------------------------------------------------------
// SYNC
// -----------------------------------------------------------------------------

/// POST /api/v1/inventory/sync
///
/// Refused with 409 while another reconciliation is running.
pub async fn sync_inventory(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = sync::reconcile_inventory(&state, token).await;
    let summary = observe("POST", "/api/v1/inventory/sync", start, result)?;

    Ok(Json(json!({
        "message": "Inventory sync completed",
        "result": summary
    })))
}

/// POST /api/v1/inventory/sync/orders
pub async fn sync_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<SyncReport>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = sync::run_order_sync(&state, &token).await;
    observe("POST", "/api/v1/inventory/sync/orders", start, result).map(Json)
}

/// GET /api/v1/inventory/sync/orders/last
pub async fn last_order_sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<SyncReport>> {
    let start = Instant::now();
    bearer_token(&headers)?;

    let result = async {
        state
            .cache
            .last_sync_report()
            .await?
            .ok_or_else(|| AppError::NotFound("No order sync has run yet".to_string()))
    }
    .await;

    observe("GET", "/api/v1/inventory/sync/orders/last", start, result).map(Json)
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{spawn_backend, TOKEN};
    use crate::models::StockStatus;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Router,
    };
    use std::sync::Mutex;

    /// One item: 750 of max 1000 units, reorder level 100
    async fn backend() -> (StoreClient, Arc<Mutex<i64>>) {
        let quantity = Arc::new(Mutex::new(750_i64));

        let item = |quantity: i64| {
            json!({
                "_id": "inv-1",
                "product": "p-1",
                "sku": "LMP-1",
                "quantityAvailable": quantity,
                "reorderLevel": 100,
                "maxStockLevel": 1000,
                "location": { "warehouse": "A", "section": "1", "shelf": "2" }
            })
        };

        let router = Router::new()
            .route(
                "/inventory/:id",
                get({
                    let quantity = quantity.clone();
                    move || async move {
                        let current = *quantity.lock().unwrap();
                        Json(json!({ "success": true, "data": item(current) }))
                    }
                }),
            )
            .route(
                "/inventory/:id/adjust",
                post({
                    let quantity = quantity.clone();
                    move |Json(body): Json<StockAdjustment>| async move {
                        let mut current = quantity.lock().unwrap();
                        *current += body.adjustment;
                        Json(json!({ "success": true, "data": item(*current) }))
                    }
                }),
            );

        (spawn_backend(router).await, quantity)
    }

    fn request(adjustment: i64) -> AdjustStockRequest {
        AdjustStockRequest {
            adjustment,
            reason: AdjustmentReason::DamagedGoods,
            notes: None,
        }
    }

    #[tokio::test]
    async fn draining_stock_marks_item_out_of_stock() {
        let (client, quantity) = backend().await;

        let item = apply_adjustment(&client, TOKEN, "inv-1", request(-750))
            .await
            .unwrap();
        assert_eq!(item.quantity_available, 0);
        assert!(item.is_out_of_stock);
        assert_eq!(item.status, Some(StockStatus::OutOfStock));

        // One more unit would go negative and is never sent
        let err = apply_adjustment(&client, TOKEN, "inv-1", request(-1))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(*quantity.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn adjustments_respect_max_stock_and_reject_zero() {
        let (client, quantity) = backend().await;

        let over = apply_adjustment(&client, TOKEN, "inv-1", request(251))
            .await
            .unwrap_err();
        assert_eq!(over.status(), StatusCode::BAD_REQUEST);

        let zero = apply_adjustment(&client, TOKEN, "inv-1", request(0))
            .await
            .unwrap_err();
        assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

        let item = apply_adjustment(&client, TOKEN, "inv-1", request(250))
            .await
            .unwrap();
        assert_eq!(item.quantity_available, 1000);
        assert_eq!(item.status, Some(StockStatus::InStock));
        assert_eq!(*quantity.lock().unwrap(), 1000);
    }

    fn bulk(entries: Value) -> BulkInventoryUpdate {
        serde_json::from_value(json!({ "updates": entries })).unwrap()
    }

    fn settings(id: &str, reorder: i64, max: i64) -> Value {
        json!({
            "id": id,
            "reorderLevel": reorder,
            "maxStockLevel": max,
            "location": { "warehouse": "A", "section": "1", "shelf": "2" },
            "supplier": { "name": "Acme", "contact": "acme@example.com", "leadTime": 3 }
        })
    }

    #[test]
    fn bulk_update_rejects_the_batch_on_one_bad_entry() {
        let good = bulk(json!([settings("inv-1", 10, 100), settings("inv-2", 5, 50)]));
        assert!(validate_bulk(&good).is_ok());

        let bad = bulk(json!([settings("inv-1", 10, 100), settings("inv-2", 50, 50)]));
        match validate_bulk(&bad) {
            Err(AppError::BadRequest(msg)) => assert!(msg.starts_with("Update 2 (item inv-2)")),
            other => panic!("unexpected {other:?}"),
        }

        assert!(validate_bulk(&bulk(json!([]))).is_err());
    }

    #[tokio::test]
    async fn bulk_rejection_is_a_validation_error() {
        use axum::response::IntoResponse;

        let bad = bulk(json!([settings("inv-2", 50, 50)]));
        let response = validate_bulk(&bad).unwrap_err().into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}
