// =============================================================================
// STORE API CLIENT
// =============================================================================
// Typed access to the store REST backend. Every dashboard operation ends up
// as one of the methods below.
//
// CONVENTIONS:
// - Admin calls take the caller's bearer token and forward it unchanged
// - Responses are unwrapped from the `{ success, data, ... }` envelope
// - Non-2xx responses are classified into `StoreError` variants
// - Every call records its latency under a fixed route label
// =============================================================================

use axum::body::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::error::{format_field_errors, StoreError};
use crate::metrics;
use crate::models::{
    ApproveVerificationRequest, AuthSession, BulkInventoryUpdate, Category, CategoryInput,
    ChangeRoleRequest, Envelope, InventoryItem, InventorySettings, ListResponse, LoginRequest,
    Order, PaymentVerification, Product, ProductInput, RegisterRequest, RejectionPayload,
    StockAdjustment, UpdateOrderStatusRequest, User,
};

/// Page size used when the gateway walks a whole collection
const PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched by `list_all`
const MAX_PAGES: u32 = 500;

pub type StoreResult<T> = Result<T, StoreError>;

/// Encode an id as exactly one path segment.
///
/// Ids come straight from the gateway's own path, already decoded, so
/// `..%2Fadmin` arrives here as `../admin`.
fn segment(id: &str) -> StoreResult<String> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(StoreError::NotFound(format!("No record with id '{}'", id)));
    }
    Ok(urlencoding::encode(id).into_owned())
}

// -----------------------------------------------------------------------------
// UPLOAD KIND
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Video,
}

impl UploadKind {
    fn path(&self) -> &'static str {
        match self {
            UploadKind::Image => "/upload/image",
            UploadKind::Video => "/upload/video",
        }
    }

    fn route(&self) -> &'static str {
        match self {
            UploadKind::Image => "POST /upload/image",
            UploadKind::Video => "POST /upload/video",
        }
    }
}

// -----------------------------------------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------------------------------------
/// Store backend client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    // -------------------------------------------------------------------------
    // CONSTRUCTION
    // -------------------------------------------------------------------------
    /// Build a client for `base_url` (e.g. `http://localhost:8080/api/v1`)
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("store-admin-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // -------------------------------------------------------------------------
    // EXECUTION
    // -------------------------------------------------------------------------
    /// Send a request and decode the envelope, classifying failures
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        route: &'static str,
    ) -> StoreResult<Envelope<T>> {
        let start = Instant::now();
        let result = builder.send().await;
        let duration = start.elapsed().as_secs_f64();

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                metrics::record_upstream_request(route, 0, duration);
                tracing::warn!(route = route, error = %err, "Store API unreachable");
                return Err(StoreError::Transport(err));
            }
        };

        let status = response.status();
        metrics::record_upstream_request(route, status.as_u16(), duration);

        let body = response.text().await?;
        if !status.is_success() {
            let err = classify_error(status, &body);
            tracing::debug!(route = route, status = status.as_u16(), error = %err, "Store API error");
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(Envelope {
                success: true,
                data: None,
                message: None,
                pagination: None,
                errors: None,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Decode(format!("{}: {}", route, e)))?;

        // Some endpoints answer 200 with `success: false`
        if !envelope.success {
            let message = envelope
                .message
                .clone()
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(classify_message(StatusCode::BAD_REQUEST, message, envelope.errors));
        }

        Ok(envelope)
    }

    /// Execute and require a `data` payload
    async fn data<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        route: &'static str,
    ) -> StoreResult<T> {
        self.execute::<T>(builder, route)
            .await?
            .data
            .ok_or_else(|| StoreError::Decode(format!("{}: response has no data", route)))
    }

    /// Execute and ignore any payload
    async fn unit(&self, builder: RequestBuilder, route: &'static str) -> StoreResult<()> {
        self.execute::<Value>(builder, route).await.map(|_| ())
    }

    /// Execute a list request, keeping pagination metadata
    async fn list<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        route: &'static str,
    ) -> StoreResult<ListResponse<T>> {
        let envelope = self.execute::<Vec<T>>(builder, route).await?;
        Ok(ListResponse {
            items: envelope.data.unwrap_or_default(),
            pagination: envelope.pagination,
        })
    }

    /// Walk every page of a collection
    async fn list_all<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        extra: &[(&str, String)],
        route: &'static str,
    ) -> StoreResult<Vec<T>> {
        let mut all = Vec::new();

        for page in 1..=MAX_PAGES {
            let mut query: Vec<(&str, String)> =
                vec![("page", page.to_string()), ("limit", PAGE_SIZE.to_string())];
            query.extend(extra.iter().cloned());

            let builder = self
                .request(Method::GET, path, Some(token))
                .query(&query);
            let batch = self.list::<T>(builder, route).await?;
            let fetched = batch.items.len();
            all.extend(batch.items);

            let more = match batch.pagination {
                Some(p) if p.pages > 0 => page < p.pages,
                // No metadata: keep going while pages come back full
                _ => fetched as u32 >= PAGE_SIZE,
            };
            if !more || fetched == 0 {
                break;
            }
        }

        Ok(all)
    }

    fn get(&self, path: &str, raw_query: Option<&str>, token: &str) -> RequestBuilder {
        self.request(Method::GET, &with_query(path, raw_query), Some(token))
    }

    fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: &B,
    ) -> RequestBuilder {
        self.request(method, path, Some(token)).json(body)
    }

    // =========================================================================
    // PRODUCTS
    // =========================================================================

    pub async fn list_products(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<Product>> {
        self.list(self.get("/products", query, token), "GET /products")
            .await
    }

    pub async fn list_deleted_products(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<Product>> {
        self.list(self.get("/products/deleted", query, token), "GET /products/deleted")
            .await
    }

    pub async fn get_product(&self, token: &str, id: &str) -> StoreResult<Product> {
        let path = format!("/products/{}", segment(id)?);
        self.data(self.get(&path, None, token), "GET /products/:id")
            .await
    }

    pub async fn create_product(&self, token: &str, input: &ProductInput) -> StoreResult<Product> {
        let builder = self.send_json(Method::POST, "/products", token, input);
        self.data(builder, "POST /products").await
    }

    pub async fn update_product(
        &self,
        token: &str,
        id: &str,
        input: &ProductInput,
    ) -> StoreResult<Product> {
        let builder = self.send_json(Method::PUT, &format!("/products/{}", segment(id)?), token, input);
        self.data(builder, "PUT /products/:id").await
    }

    /// Soft delete: the product moves to the delete history
    pub async fn delete_product(&self, token: &str, id: &str) -> StoreResult<()> {
        let builder = self.request(Method::DELETE, &format!("/products/{}", segment(id)?), Some(token));
        self.unit(builder, "DELETE /products/:id").await
    }

    pub async fn restore_product(&self, token: &str, id: &str) -> StoreResult<Product> {
        let builder = self.request(
            Method::POST,
            &format!("/products/{}/restore", segment(id)?),
            Some(token),
        );
        self.data(builder, "POST /products/:id/restore").await
    }

    pub async fn permanently_delete_product(&self, token: &str, id: &str) -> StoreResult<()> {
        let builder = self.request(
            Method::DELETE,
            &format!("/products/{}/permanent", segment(id)?),
            Some(token),
        );
        self.unit(builder, "DELETE /products/:id/permanent").await
    }

    // =========================================================================
    // CATEGORIES
    // =========================================================================

    pub async fn list_categories(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<Category>> {
        self.list(self.get("/categories", query, token), "GET /categories")
            .await
    }

    /// Every category, for slug uniqueness checks
    pub async fn all_categories(&self, token: &str) -> StoreResult<Vec<Category>> {
        self.list_all(token, "/categories", &[], "GET /categories")
            .await
    }

    pub async fn get_category(&self, token: &str, id: &str) -> StoreResult<Category> {
        let path = format!("/categories/{}", segment(id)?);
        self.data(self.get(&path, None, token), "GET /categories/:id")
            .await
    }

    pub async fn create_category(
        &self,
        token: &str,
        input: &CategoryInput,
    ) -> StoreResult<Category> {
        let builder = self.send_json(Method::POST, "/categories", token, input);
        self.data(builder, "POST /categories").await
    }

    pub async fn update_category(
        &self,
        token: &str,
        id: &str,
        input: &CategoryInput,
    ) -> StoreResult<Category> {
        let builder = self.send_json(Method::PUT, &format!("/categories/{}", segment(id)?), token, input);
        self.data(builder, "PUT /categories/:id").await
    }

    pub async fn delete_category(&self, token: &str, id: &str) -> StoreResult<()> {
        let builder = self.request(Method::DELETE, &format!("/categories/{}", segment(id)?), Some(token));
        self.unit(builder, "DELETE /categories/:id").await
    }

    // =========================================================================
    // INVENTORY
    // =========================================================================

    pub async fn list_inventory(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<InventoryItem>> {
        self.list(self.get("/inventory", query, token), "GET /inventory")
            .await
    }

    /// Every inventory record
    pub async fn all_inventory(&self, token: &str) -> StoreResult<Vec<InventoryItem>> {
        self.list_all(token, "/inventory", &[], "GET /inventory")
            .await
    }

    pub async fn get_inventory_item(&self, token: &str, id: &str) -> StoreResult<InventoryItem> {
        let path = format!("/inventory/{}", segment(id)?);
        self.data(self.get(&path, None, token), "GET /inventory/:id")
            .await
    }

    pub async fn update_inventory_item(
        &self,
        token: &str,
        id: &str,
        settings: &InventorySettings,
    ) -> StoreResult<InventoryItem> {
        let builder = self.send_json(Method::PUT, &format!("/inventory/{}", segment(id)?), token, settings);
        self.data(builder, "PUT /inventory/:id").await
    }

    pub async fn adjust_stock(
        &self,
        token: &str,
        id: &str,
        adjustment: &StockAdjustment,
    ) -> StoreResult<InventoryItem> {
        let builder = self.send_json(
            Method::POST,
            &format!("/inventory/{}/adjust", segment(id)?),
            token,
            adjustment,
        );
        self.data(builder, "POST /inventory/:id/adjust").await
    }

    pub async fn low_stock_items(&self, token: &str) -> StoreResult<Vec<InventoryItem>> {
        let envelope = self
            .execute::<Vec<InventoryItem>>(
                self.get("/inventory/low-stock", None, token),
                "GET /inventory/low-stock",
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn inventory_stats(&self, token: &str) -> StoreResult<Value> {
        self.data(self.get("/inventory/stats", None, token), "GET /inventory/stats")
            .await
    }

    pub async fn bulk_update_inventory(
        &self,
        token: &str,
        update: &BulkInventoryUpdate,
    ) -> StoreResult<Value> {
        let builder = self.send_json(Method::POST, "/inventory/bulk-update", token, update);
        let envelope = self.execute::<Value>(builder, "POST /inventory/bulk-update").await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Ask the backend to reconcile inventory with product stock
    pub async fn sync_inventory(&self, token: &str) -> StoreResult<Value> {
        let builder = self.request(Method::POST, "/inventory/sync", Some(token));
        let envelope = self.execute::<Value>(builder, "POST /inventory/sync").await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    // =========================================================================
    // ORDERS
    // =========================================================================

    pub async fn list_orders(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<Order>> {
        self.list(self.get("/admin/orders", query, token), "GET /admin/orders")
            .await
    }

    /// Every order updated at or after `since`
    pub async fn orders_updated_since(
        &self,
        token: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<Order>> {
        let since = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.list_all(
            token,
            "/admin/orders",
            &[("updatedSince", since)],
            "GET /admin/orders",
        )
        .await
    }

    pub async fn order_stats(&self, token: &str) -> StoreResult<Value> {
        self.data(
            self.get("/admin/orders/stats", None, token),
            "GET /admin/orders/stats",
        )
        .await
    }

    pub async fn get_order(&self, token: &str, id: &str) -> StoreResult<Order> {
        let path = format!("/admin/orders/{}", segment(id)?);
        self.data(self.get(&path, None, token), "GET /admin/orders/:id")
            .await
    }

    pub async fn update_order_status(
        &self,
        token: &str,
        id: &str,
        request: &UpdateOrderStatusRequest,
    ) -> StoreResult<Order> {
        let builder = self.send_json(
            Method::PUT,
            &format!("/admin/orders/{}/status", segment(id)?),
            token,
            request,
        );
        self.data(builder, "PUT /admin/orders/:id/status").await
    }

    // =========================================================================
    // USERS
    // =========================================================================

    pub async fn list_users(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<User>> {
        self.list(self.get("/admin/users", query, token), "GET /admin/users")
            .await
    }

    pub async fn get_user(&self, token: &str, id: &str) -> StoreResult<User> {
        let path = format!("/admin/users/{}", segment(id)?);
        self.data(self.get(&path, None, token), "GET /admin/users/:id")
            .await
    }

    pub async fn change_user_role(
        &self,
        token: &str,
        id: &str,
        request: &ChangeRoleRequest,
    ) -> StoreResult<User> {
        let builder = self.send_json(
            Method::PUT,
            &format!("/admin/users/{}/role", segment(id)?),
            token,
            request,
        );
        self.data(builder, "PUT /admin/users/:id/role").await
    }

    pub async fn delete_user(&self, token: &str, id: &str) -> StoreResult<()> {
        let builder = self.request(Method::DELETE, &format!("/admin/users/{}", segment(id)?), Some(token));
        self.unit(builder, "DELETE /admin/users/:id").await
    }

    // =========================================================================
    // PAYMENT VERIFICATION
    // =========================================================================

    pub async fn list_verifications(
        &self,
        token: &str,
        query: Option<&str>,
    ) -> StoreResult<ListResponse<PaymentVerification>> {
        self.list(
            self.get("/admin/payment-verifications", query, token),
            "GET /admin/payment-verifications",
        )
        .await
    }

    pub async fn verification_stats(&self, token: &str) -> StoreResult<Value> {
        self.data(
            self.get("/admin/payment-verifications/stats", None, token),
            "GET /admin/payment-verifications/stats",
        )
        .await
    }

    pub async fn get_verification(
        &self,
        token: &str,
        id: &str,
    ) -> StoreResult<PaymentVerification> {
        let path = format!("/admin/payment-verifications/{}", segment(id)?);
        self.data(
            self.get(&path, None, token),
            "GET /admin/payment-verifications/:id",
        )
        .await
    }

    pub async fn approve_verification(
        &self,
        token: &str,
        id: &str,
        request: &ApproveVerificationRequest,
    ) -> StoreResult<PaymentVerification> {
        let builder = self.send_json(
            Method::POST,
            &format!("/admin/payment-verifications/{}/approve", segment(id)?),
            token,
            request,
        );
        self.data(builder, "POST /admin/payment-verifications/:id/approve")
            .await
    }

    pub async fn reject_verification(
        &self,
        token: &str,
        id: &str,
        payload: &RejectionPayload,
    ) -> StoreResult<PaymentVerification> {
        let builder = self.send_json(
            Method::POST,
            &format!("/admin/payment-verifications/{}/reject", segment(id)?),
            token,
            payload,
        );
        self.data(builder, "POST /admin/payment-verifications/:id/reject")
            .await
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    pub async fn login(&self, request: &LoginRequest) -> StoreResult<AuthSession> {
        let builder = self.request(Method::POST, "/auth/login", None).json(request);
        self.data(builder, "POST /auth/login").await
    }

    pub async fn register(&self, request: &RegisterRequest) -> StoreResult<AuthSession> {
        let builder = self.request(Method::POST, "/auth/register", None).json(request);
        self.data(builder, "POST /auth/register").await
    }

    pub async fn me(&self, token: &str) -> StoreResult<User> {
        self.data(self.get("/auth/me", None, token), "GET /auth/me")
            .await
    }

    pub async fn logout(&self, token: &str) -> StoreResult<()> {
        let builder = self.request(Method::POST, "/auth/logout", Some(token));
        self.unit(builder, "POST /auth/logout").await
    }

    // =========================================================================
    // UPLOADS
    // =========================================================================
    /// Forward an upload body (typically multipart) untouched
    pub async fn upload(
        &self,
        token: &str,
        kind: UploadKind,
        content_type: &str,
        body: Bytes,
    ) -> StoreResult<Value> {
        let builder = self
            .request(Method::POST, kind.path(), Some(token))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        let envelope = self.execute::<Value>(builder, kind.route()).await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------
    /// The backend is considered reachable if it answers at all
    pub async fn health_check(&self) -> bool {
        self.http.get(self.base_url.as_str()).send().await.is_ok()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Append a raw, already-encoded query string to a path
fn with_query(path: &str, raw_query: Option<&str>) -> String {
    match raw_query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => format!("{}?{}", path, query.trim_start_matches('?')),
        None => path.to_string(),
    }
}

/// Map a non-2xx response to a `StoreError`
pub fn classify_error(status: StatusCode, body: &str) -> StoreError {
    let envelope = serde_json::from_str::<Envelope<Value>>(body).ok();

    let (message, errors) = match envelope {
        Some(env) => (env.message, env.errors),
        None => (None, None),
    };
    let message = message
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    classify_message(status, message, errors)
}

fn classify_message(
    status: StatusCode,
    message: String,
    errors: Option<Vec<crate::models::FieldError>>,
) -> StoreError {
    // The backend's throttle responses are not always 429
    if status == StatusCode::TOO_MANY_REQUESTS
        || message.to_lowercase().contains("too many requests")
    {
        return StoreError::RateLimited;
    }

    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthorized,
        StatusCode::FORBIDDEN => StoreError::Forbidden(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT => StoreError::Conflict(message),
        StatusCode::PAYLOAD_TOO_LARGE => StoreError::PayloadTooLarge,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => match errors {
            Some(errors) if !errors.is_empty() => {
                StoreError::Validation(format_field_errors(&errors))
            }
            _ => StoreError::Validation(message),
        },
        _ => StoreError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================
/// In-process stand-in for the store backend
#[cfg(test)]
pub mod test_support {
    use axum::{http::HeaderMap, Router};

    use super::StoreClient;

    pub const TOKEN: &str = "test-admin-token";

    /// Serve `router` on an ephemeral port and return a client pointed at it
    pub async fn spawn_backend(router: Router) -> StoreClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test backend");
        });

        StoreClient::new(
            &format!("http://{}", addr),
            std::time::Duration::from_secs(5),
        )
        .expect("build client")
    }

    pub fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TOKEN))
            .unwrap_or(false)
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::test_support::{authorized, spawn_backend, TOKEN};
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::HeaderMap,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn classify_maps_status_codes() {
        assert!(matches!(
            classify_error(StatusCode::UNAUTHORIZED, ""),
            StoreError::Unauthorized
        ));
        assert!(matches!(
            classify_error(StatusCode::PAYLOAD_TOO_LARGE, "too big"),
            StoreError::PayloadTooLarge
        ));
        assert!(matches!(
            classify_error(StatusCode::NOT_FOUND, r#"{"success":false,"message":"Product not found"}"#),
            StoreError::NotFound(msg) if msg == "Product not found"
        ));
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            StoreError::Upstream { status: 500, .. }
        ));
    }

    #[test]
    fn classify_formats_validation_details() {
        let body = r#"{
            "success": false,
            "message": "Validation failed",
            "errors": [
                {"field": "name", "message": "Name is required"},
                {"field": "price", "message": "Price must be positive"}
            ]
        }"#;
        match classify_error(StatusCode::BAD_REQUEST, body) {
            StoreError::Validation(msg) => {
                assert_eq!(msg, "name: Name is required; price: Price must be positive")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn classify_detects_throttling_by_message() {
        let body = r#"{"success":false,"message":"Too many requests from this IP"}"#;
        assert!(matches!(
            classify_error(StatusCode::INTERNAL_SERVER_ERROR, body),
            StoreError::RateLimited
        ));
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, ""),
            StoreError::RateLimited
        ));
    }

    #[test]
    fn raw_query_is_appended_verbatim() {
        assert_eq!(with_query("/products", None), "/products");
        assert_eq!(with_query("/products", Some("")), "/products");
        assert_eq!(
            with_query("/products", Some("page=2&search=red%20lamp")),
            "/products?page=2&search=red%20lamp"
        );
    }

    async fn inventory_item(headers: HeaderMap, Path(id): Path<String>) -> axum::response::Response {
        if !authorized(&headers) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Invalid token" })),
            )
                .into_response();
        }
        Json(json!({
            "success": true,
            "data": {
                "_id": id,
                "product": "p-1",
                "sku": "SKU-1",
                "quantityAvailable": 8,
                "reorderLevel": 10,
                "maxStockLevel": 50
            }
        }))
        .into_response()
    }

    #[tokio::test]
    async fn forwards_bearer_token_and_unwraps_envelope() {
        let client =
            spawn_backend(Router::new().route("/inventory/:id", get(inventory_item))).await;

        let item = client.get_inventory_item(TOKEN, "inv-7").await.unwrap();
        assert_eq!(item.id, "inv-7");
        assert_eq!(item.quantity_available, 8);

        let err = client.get_inventory_item("wrong", "inv-7").await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));
    }

    #[tokio::test]
    async fn list_all_walks_every_page() {
        async fn pages(Query(q): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
            let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let items: Vec<_> = (0..if page < 3 { 2 } else { 1 })
                .map(|i| {
                    json!({
                        "_id": format!("inv-{}-{}", page, i),
                        "product": format!("p-{}-{}", page, i),
                        "quantityAvailable": 1,
                        "maxStockLevel": 10
                    })
                })
                .collect();
            Json(json!({
                "success": true,
                "data": items,
                "pagination": { "page": page, "limit": 2, "total": 5, "pages": 3 }
            }))
        }

        let client = spawn_backend(Router::new().route("/inventory", get(pages))).await;
        let all = client.all_inventory(TOKEN).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].id, "inv-3-0");
    }

    #[tokio::test]
    async fn ids_stay_inside_their_own_path_segment() {
        use axum::routing::delete;
        use std::sync::{Arc, Mutex};

        let hits = Arc::new(Mutex::new(Vec::<String>::new()));
        let record = |prefix: &'static str| {
            let hits = hits.clone();
            move |Path(id): Path<String>| async move {
                hits.lock().unwrap().push(format!("{} {}", prefix, id));
                Json(json!({ "success": true }))
            }
        };
        let router = Router::new()
            .route("/categories/:id", delete(record("category")))
            .route("/admin/users/:id", delete(record("user")));
        let client = spawn_backend(router).await;

        client
            .delete_category(TOKEN, "../admin/users/u-admin")
            .await
            .unwrap();
        assert_eq!(
            *hits.lock().unwrap(),
            vec!["category ../admin/users/u-admin".to_string()]
        );

        let err = client.delete_category(TOKEN, "..").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(hits.lock().unwrap().len(), 1);
    }

    #[test]
    fn segments_are_percent_encoded() {
        assert_eq!(segment("65f1c2a9e4b0").unwrap(), "65f1c2a9e4b0");
        assert_eq!(segment("a/b?c#d").unwrap(), "a%2Fb%3Fc%23d");
        assert!(segment("").is_err());
        assert!(segment(".").is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // Nothing listens on port 9 of localhost in the test environment
        let client = StoreClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.me(TOKEN).await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
