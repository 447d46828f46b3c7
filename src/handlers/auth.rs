// =============================================================================
// AUTH HANDLERS
// =============================================================================
// Thin proxies over the backend's auth routes. Login is the one place the
// gateway looks at the role: this is an admin console, so a customer
// account is turned away even with valid credentials.
// =============================================================================

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use super::{bearer_token, observe, observe_with};
use crate::client::StoreClient;
use crate::error::{AppError, AppResult};
use crate::models::{AuthSession, LoginRequest, RegisterRequest, User, UserRole};
use crate::AppState;

pub(crate) async fn admin_login(client: &StoreClient, request: &LoginRequest) -> AppResult<AuthSession> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let session = client.login(request).await?;
    if session.user.role != UserRole::Admin {
        tracing::warn!(user_id = %session.user.id, "Non-admin login refused");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    tracing::info!(user_id = %session.user.id, "Admin signed in");
    Ok(session)
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthSession>> {
    let start = Instant::now();
    let result = admin_login(&state.client, &request).await;
    observe("POST", "/api/v1/auth/login", start, result).map(Json)
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthSession>)> {
    let start = Instant::now();

    let result = state.client.register(&request).await.map_err(AppError::from);
    observe_with("POST", "/api/v1/auth/register", start, StatusCode::CREATED, result)
        .map(|session| (StatusCode::CREATED, Json(session)))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<User>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.me(&token).await.map_err(AppError::from);
    observe("GET", "/api/v1/auth/me", start, result).map(Json)
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.logout(&token).await.map_err(AppError::from);
    observe("POST", "/api/v1/auth/logout", start, result)?;

    Ok(Json(json!({ "message": "Logged out" })))
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};
    use crate::client::test_support::spawn_backend;

    async fn backend() -> StoreClient {
        let router = Router::new().route(
            "/auth/login",
            post(|Json(body): Json<LoginRequest>| async move {
                if body.password != "secret" {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "success": false, "message": "Invalid credentials" })),
                    );
                }
                let role = if body.email.starts_with("admin") { "admin" } else { "customer" };
                (
                    StatusCode::OK,
                    Json(json!({ "success": true, "data": {
                        "token": "jwt-token",
                        "user": { "_id": "u-1", "name": "Sam", "email": body.email, "role": role }
                    }})),
                )
            }),
        );
        spawn_backend(router).await
    }

    fn credentials(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn admins_get_a_session() {
        let client = backend().await;
        let session = admin_login(&client, &credentials("admin@shop.test", "secret"))
            .await
            .unwrap();
        assert_eq!(session.token, "jwt-token");
        assert_eq!(session.user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn customers_and_bad_credentials_are_refused() {
        let client = backend().await;

        let customer = admin_login(&client, &credentials("sam@shop.test", "secret"))
            .await
            .unwrap_err();
        assert_eq!(customer.status(), StatusCode::FORBIDDEN);

        let wrong = admin_login(&client, &credentials("admin@shop.test", "nope"))
            .await
            .unwrap_err();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let blank = admin_login(&client, &credentials(" ", "")).await.unwrap_err();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }
}
