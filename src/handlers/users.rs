// =============================================================================
// USER HANDLERS
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
use crate::models::{ChangeRoleRequest, ListResponse, User};
use crate::rules;
use crate::AppState;

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<User>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_users(&token, query.as_deref())
        .await
        .map_err(AppError::from);
    observe("GET", "/api/v1/users", start, result).map(Json)
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.get_user(&token, &id).await.map_err(AppError::from);
    observe("GET", "/api/v1/users/:id", start, result).map(Json)
}

/// PUT /api/v1/users/:id/role
pub async fn change_user_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ChangeRoleRequest>,
) -> AppResult<Json<User>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .change_user_role(&token, &id, &request)
        .await
        .map_err(AppError::from);

    if let Ok(user) = &result {
        tracing::info!(user_id = %id, role = ?user.role, "User role changed");
    }
    observe("PUT", "/api/v1/users/:id/role", start, result).map(Json)
}

/// Delete a customer account; admins have to be demoted first
pub(crate) async fn delete_customer(client: &StoreClient, token: &str, id: &str) -> AppResult<()> {
    let user = client.get_user(token, id).await?;
    rules::ensure_user_deletable(&user)?;

    client.delete_user(token, id).await?;
    tracing::info!(user_id = %id, email = %user.email, "User deleted");
    Ok(())
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = delete_customer(&state.client, &token, &id).await;
    observe("DELETE", "/api/v1/users/:id", start, result)?;

    Ok(Json(json!({ "id": id, "message": "User deleted" })))
}
