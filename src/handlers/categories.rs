// =============================================================================
// CATEGORY HANDLERS
// =============================================================================
// Slugs are derived from the name when left blank and must be unique, so
// create/update read the current category list before writing.
// =============================================================================

use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use super::{bearer_token, observe, observe_with};
use crate::client::StoreClient;
use crate::error::{AppError, AppResult};
use crate::models::{Category, CategoryInput, ListResponse};
use crate::rules;
use crate::AppState;

/// GET /api/v1/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<Category>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_categories(&token, query.as_deref())
        .await
        .map_err(AppError::from);
    observe("GET", "/api/v1/categories", start, result).map(Json)
}

/// GET /api/v1/categories/:id
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Category>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.get_category(&token, &id).await.map_err(AppError::from);
    observe("GET", "/api/v1/categories/:id", start, result).map(Json)
}

/// Validate against the live category list, then create or update
pub(crate) async fn save_category(
    client: &StoreClient,
    token: &str,
    editing_id: Option<&str>,
    input: CategoryInput,
) -> AppResult<Category> {
    let existing = client.all_categories(token).await?;
    let input = rules::prepare_category(input, &existing, editing_id)?;

    let category = match editing_id {
        Some(id) => client.update_category(token, id, &input).await?,
        None => client.create_category(token, &input).await?,
    };

    tracing::info!(
        category_id = %category.id,
        slug = %category.slug,
        created = editing_id.is_none(),
        "Category saved"
    );
    Ok(category)
}

/// POST /api/v1/categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = save_category(&state.client, &token, None, input).await;
    observe_with("POST", "/api/v1/categories", start, StatusCode::CREATED, result)
        .map(|category| (StatusCode::CREATED, Json(category)))
}

/// PUT /api/v1/categories/:id
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = save_category(&state.client, &token, Some(&id), input).await;
    observe("PUT", "/api/v1/categories/:id", start, result).map(Json)
}

/// DELETE /api/v1/categories/:id
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.delete_category(&token, &id).await.map_err(AppError::from);
    observe("DELETE", "/api/v1/categories/:id", start, result)?;

    tracing::info!(category_id = %id, "Category deleted");
    Ok(Json(json!({ "id": id, "message": "Category deleted" })))
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{spawn_backend, TOKEN};
    use axum::{routing::get, Router};
    use std::sync::Mutex;

    async fn backend() -> (StoreClient, Arc<Mutex<Vec<Value>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));

        let list = || async {
            Json(json!({
                "success": true,
                "data": [
                    { "_id": "c-1", "name": "Home & Garden", "slug": "home-garden" },
                    { "_id": "c-2", "name": "Lighting", "slug": "lighting" }
                ],
                "pagination": { "page": 1, "limit": 100, "total": 2, "pages": 1 }
            }))
        };

        let router = Router::new()
            .route(
                "/categories",
                get(list).post({
                    let written = written.clone();
                    move |Json(body): Json<Value>| async move {
                        written.lock().unwrap().push(body.clone());
                        let mut data = body;
                        data["_id"] = json!("c-new");
                        (StatusCode::CREATED, Json(json!({ "success": true, "data": data })))
                    }
                }),
            )
            .route(
                "/categories/:id",
                axum::routing::put({
                    let written = written.clone();
                    move |Path(id): Path<String>, Json(body): Json<Value>| async move {
                        written.lock().unwrap().push(body.clone());
                        let mut data = body;
                        data["_id"] = json!(id);
                        Json(json!({ "success": true, "data": data }))
                    }
                }),
            );

        (spawn_backend(router).await, written)
    }

    fn input(name: &str, slug: &str) -> CategoryInput {
        serde_json::from_value(json!({ "name": name, "slug": slug })).unwrap()
    }

    #[tokio::test]
    async fn blank_slug_is_derived_before_create() {
        let (client, written) = backend().await;

        let created = save_category(&client, TOKEN, None, input("Desk Lamps", ""))
            .await
            .unwrap();
        assert_eq!(created.id, "c-new");
        assert_eq!(created.slug, "desk-lamps");
        assert_eq!(written.lock().unwrap()[0]["slug"], "desk-lamps");
    }

    #[tokio::test]
    async fn duplicate_slug_never_reaches_the_backend() {
        let (client, written) = backend().await;

        let err = save_category(&client, TOKEN, None, input("Home and Garden", "home-garden"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn editing_a_category_may_keep_its_own_slug() {
        let (client, _) = backend().await;

        let updated = save_category(&client, TOKEN, Some("c-2"), input("Lighting", "lighting"))
            .await
            .unwrap();
        assert_eq!(updated.id, "c-2");
    }
}
