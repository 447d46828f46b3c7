// =============================================================================
// STORE ADMIN GATEWAY - Main Entry Point
// =============================================================================
// Server side of the store's admin dashboard.
//
// WHAT THIS SERVICE DOES:
// - Proxies the dashboard's product, category, order, user, inventory and
//   payment verification operations to the store REST backend
// - Enforces the dashboard's business rules before anything is written
//   (prices, stock bounds, slugs, delete lifecycle, one-shot decisions)
// - Reconciles inventory with order status changes (manual or on a timer)
// - Exposes Prometheus metrics and health probes
// =============================================================================

// -----------------------------------------------------------------------------
// MODULE DECLARATIONS
// -----------------------------------------------------------------------------
mod cache;       // Redis checkpoint, reports and locks (cache.rs)
mod client;      // Store backend HTTP client (client.rs)
mod config;      // Configuration loading (config.rs)
mod error;       // Error types (error.rs)
mod handlers;    // HTTP request handlers (handlers/)
mod metrics;     // Prometheus metrics setup (metrics.rs)
mod models;      // Data structures (models.rs)
mod rules;       // Business rules (rules.rs)
mod sync;        // Order → inventory reconciliation (sync.rs)

// -----------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::Cache;
use crate::client::StoreClient;
use crate::config::Config;
use crate::handlers::{auth, categories, inventory, orders, payments, products, uploads, users};
use crate::metrics::setup_metrics;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by every handler through `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    // Store backend client (shares one connection pool)
    pub client: StoreClient,

    // Redis: sync checkpoint, last report, locks
    pub cache: Cache,

    // Renders metrics in Prometheus format
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

// -----------------------------------------------------------------------------
// MAIN FUNCTION
// -----------------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok(); // .env is optional

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG overrides the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,store_admin_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Store Admin Gateway...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        store_api_url = %config.store_api_url,
        "Configuration loaded"
    );

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Build the store backend client
    // -------------------------------------------------------------------------
    let client = StoreClient::new(&config.store_api_url, config.upstream_timeout)?;
    if !client.health_check().await {
        // Not fatal: /ready reports it until the backend comes up
        tracing::warn!(store_api_url = %config.store_api_url, "Store API not reachable yet");
    }

    // -------------------------------------------------------------------------
    // STEP 6: Connect to Redis
    // -------------------------------------------------------------------------
    let redis_client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    info!("Connected to Redis");

    // -------------------------------------------------------------------------
    // STEP 7: Create application state
    // -------------------------------------------------------------------------
    let port = config.port;
    let max_upload_bytes = config.max_upload_bytes;
    let state = Arc::new(AppState {
        config,
        client,
        cache: Cache::new(redis_conn),
        metrics_handle,
    });

    // -------------------------------------------------------------------------
    // STEP 8: Start the order sync timer
    // -------------------------------------------------------------------------
    match (
        state.config.order_sync_interval,
        state.config.admin_api_token.clone(),
    ) {
        (Some(every), Some(token)) => {
            sync::spawn_order_sync_loop(state.clone(), token, every);
            info!(interval_secs = every.as_secs(), "Order sync timer started");
        }
        (Some(_), None) => {
            tracing::warn!("ORDER_SYNC_INTERVAL_SECS is set but ADMIN_API_TOKEN is not; order sync timer disabled")
        }
        _ => info!("Order sync timer disabled"),
    }

    // -------------------------------------------------------------------------
    // STEP 9: Define routes
    // -------------------------------------------------------------------------
    let app = Router::new()
        // ----- Health, Readiness & Metrics -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        // ----- Auth -----
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/logout", post(auth::logout))
        // ----- Products -----
        .route(
            "/api/v1/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/api/v1/products/deleted", get(products::list_deleted_products))
        .route(
            "/api/v1/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/v1/products/:id/restore", post(products::restore_product))
        .route(
            "/api/v1/products/:id/permanent",
            delete(products::permanently_delete_product),
        )
        // ----- Categories -----
        .route(
            "/api/v1/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/v1/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // ----- Orders -----
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/stats", get(orders::order_stats))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", put(orders::update_order_status))
        // ----- Users -----
        .route("/api/v1/users", get(users::list_users))
        .route(
            "/api/v1/users/:id",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/api/v1/users/:id/role", put(users::change_user_role))
        // ----- Inventory -----
        .route("/api/v1/inventory", get(inventory::list_inventory))
        .route("/api/v1/inventory/low-stock", get(inventory::low_stock_items))
        .route("/api/v1/inventory/stats", get(inventory::inventory_stats))
        .route(
            "/api/v1/inventory/adjustment-reasons",
            get(inventory::adjustment_reasons),
        )
        .route("/api/v1/inventory/bulk-update", post(inventory::bulk_update_inventory))
        .route("/api/v1/inventory/sync", post(inventory::sync_inventory))
        .route("/api/v1/inventory/sync/orders", post(inventory::sync_orders))
        .route(
            "/api/v1/inventory/sync/orders/last",
            get(inventory::last_order_sync),
        )
        .route(
            "/api/v1/inventory/:id",
            get(inventory::get_inventory_item).put(inventory::update_inventory_item),
        )
        .route("/api/v1/inventory/:id/adjust", post(inventory::adjust_stock))
        // ----- Payment Verification -----
        .route(
            "/api/v1/payment-verifications",
            get(payments::list_verifications),
        )
        .route(
            "/api/v1/payment-verifications/stats",
            get(payments::verification_stats),
        )
        .route(
            "/api/v1/payment-verifications/rejection-reasons",
            get(payments::rejection_reasons),
        )
        .route(
            "/api/v1/payment-verifications/:id",
            get(payments::get_verification),
        )
        .route(
            "/api/v1/payment-verifications/:id/approve",
            post(payments::approve_verification),
        )
        .route(
            "/api/v1/payment-verifications/:id/reject",
            post(payments::reject_verification),
        )
        // ----- Uploads -----
        .route(
            "/api/v1/upload/image",
            post(uploads::upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/api/v1/upload/video",
            post(uploads::upload_video).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // ----- Middleware Layers -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // -------------------------------------------------------------------------
    // STEP 10: Start the HTTP server
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Store Admin Gateway is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
