// =============================================================================
// PRODUCT HANDLERS
// =============================================================================
// Catalog CRUD plus the delete lifecycle:
//   active → soft-deleted (delete history) → permanently deleted
//   soft-deleted → active (restore)
//
// Lifecycle moves are checked against the product's current state before the
// backend is asked to perform them.
// =============================================================================

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use super::{bearer_token, observe, observe_with};
use crate::client::StoreClient;
use crate::error::{AppError, AppResult};
use crate::models::{ListResponse, Product, ProductInput};
use crate::rules::{self, ProductAction, ProductLifecycle};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

// -----------------------------------------------------------------------------
// LISTS
// -----------------------------------------------------------------------------

fn live_only(mut list: ListResponse<Product>) -> ListResponse<Product> {
    list.items.retain(|p| !p.is_soft_deleted());
    list
}

fn history_only(mut list: ListResponse<Product>) -> ListResponse<Product> {
    list.items.retain(Product::is_soft_deleted);
    list
}

/// GET /api/v1/products
///
/// Query string (page, limit, sort, search, category, ...) is forwarded as is.
/// Soft-deleted products never appear here.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<Product>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_products(&token, query.as_deref())
        .await
        .map(live_only)
        .map_err(AppError::from);

    observe("GET", "/api/v1/products", start, result).map(Json)
}

/// GET /api/v1/products/deleted
pub async fn list_deleted_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<Product>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_deleted_products(&token, query.as_deref())
        .await
        .map(history_only)
        .map_err(AppError::from);

    observe("GET", "/api/v1/products/deleted", start, result).map(Json)
}

/// GET /api/v1/products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.get_product(&token, &id).await.map_err(AppError::from);
    observe("GET", "/api/v1/products/:id", start, result).map(Json)
}

// -----------------------------------------------------------------------------
// CREATE / UPDATE
// -----------------------------------------------------------------------------

/// POST /api/v1/products
///
/// The form is validated and normalized (discount recomputed, one primary
/// image) before it reaches the backend.
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = async {
        let input = rules::prepare_product(input)?;
        let product = state.client.create_product(&token, &input).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        Ok::<_, AppError>(product)
    }
    .await;

    observe_with("POST", "/api/v1/products", start, StatusCode::CREATED, result)
        .map(|product| (StatusCode::CREATED, Json(product)))
}

/// PUT /api/v1/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = async {
        let input = rules::prepare_product(input)?;
        let product = state.client.update_product(&token, &id, &input).await?;
        tracing::info!(product_id = %product.id, "Product updated");
        Ok::<_, AppError>(product)
    }
    .await;

    observe("PUT", "/api/v1/products/:id", start, result).map(Json)
}

// -----------------------------------------------------------------------------
// DELETE LIFECYCLE
// -----------------------------------------------------------------------------

/// Check that `action` is allowed for the product's current state
async fn check_transition(
    client: &StoreClient,
    token: &str,
    id: &str,
    action: ProductAction,
) -> AppResult<Product> {
    let product = client.get_product(token, id).await?;
    ProductLifecycle::of(&product).apply(action)?;
    Ok(product)
}

pub(crate) async fn soft_delete(client: &StoreClient, token: &str, id: &str) -> AppResult<()> {
    let product = check_transition(client, token, id, ProductAction::SoftDelete).await?;
    client.delete_product(token, id).await?;
    tracing::info!(product_id = %id, sku = ?product.sku, "Product moved to delete history");
    Ok(())
}

pub(crate) async fn restore(client: &StoreClient, token: &str, id: &str) -> AppResult<Product> {
    check_transition(client, token, id, ProductAction::Restore).await?;
    let product = client.restore_product(token, id).await?;
    tracing::info!(product_id = %id, "Product restored");
    Ok(product)
}

pub(crate) async fn purge(
    client: &StoreClient,
    token: &str,
    id: &str,
    confirmed: bool,
) -> AppResult<()> {
    if !confirmed {
        return Err(AppError::BadRequest(
            "Permanent deletion cannot be undone; repeat the request with confirm=true"
                .to_string(),
        ));
    }

    let product = check_transition(client, token, id, ProductAction::PermanentDelete).await?;
    client.permanently_delete_product(token, id).await?;
    tracing::warn!(product_id = %id, sku = ?product.sku, "Product permanently deleted");
    Ok(())
}

/// DELETE /api/v1/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = soft_delete(&state.client, &token, &id).await;
    observe("DELETE", "/api/v1/products/:id", start, result)?;

    Ok(Json(json!({
        "id": id,
        "message": "Product moved to delete history"
    })))
}

/// POST /api/v1/products/:id/restore
pub async fn restore_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = restore(&state.client, &token, &id).await;
    observe("POST", "/api/v1/products/:id/restore", start, result).map(Json)
}

/// DELETE /api/v1/products/:id/permanent?confirm=true
pub async fn permanently_delete_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<ConfirmParams>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = purge(&state.client, &token, &id, params.confirm).await;
    observe("DELETE", "/api/v1/products/:id/permanent", start, result)?;

    Ok(Json(json!({
        "id": id,
        "message": "Product permanently deleted"
    })))
}
