// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the admin gateway.
//
// METRIC TYPES USED:
// - Counter: requests, adjustments, sync runs, payment decisions
// - Gauge: stock levels and the low-stock item count
// - Histogram: HTTP, store API and Redis latency
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// METRIC NAMES
// =============================================================================

/// HTTP request counter
/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// HTTP request duration histogram
/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Store API call counter
/// Labels: route ("GET /inventory"), status (0 when unreachable)
pub const UPSTREAM_REQUESTS_TOTAL: &str = "store_api_requests_total";

/// Store API call latency
/// Labels: route
pub const UPSTREAM_REQUEST_DURATION_SECONDS: &str = "store_api_request_duration_seconds";

/// Redis operation duration histogram
/// Labels: operation
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

/// Inventory stock level gauge
/// Labels: sku, warehouse
pub const INVENTORY_STOCK_LEVEL: &str = "inventory_stock_level";

/// Items at or below their reorder level
pub const INVENTORY_LOW_STOCK_ITEMS: &str = "inventory_low_stock_items";

/// Stock adjustments sent to the store API
/// Labels: source (manual/order_sync), status (success/failed)
pub const STOCK_ADJUSTMENTS_TOTAL: &str = "inventory_stock_adjustments_total";

/// Reconciliation runs
/// Labels: kind (inventory/orders), status (success/failed)
pub const SYNC_RUNS_TOTAL: &str = "inventory_sync_runs_total";

/// Line items an order sync could not apply
pub const ORDER_SYNC_FAILURES_TOTAL: &str = "order_sync_item_failures_total";

/// Payment verification decisions
/// Labels: decision (approved/rejected)
pub const PAYMENT_DECISIONS_TOTAL: &str = "payment_verification_decisions_total";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the Prometheus recorder and describe every metric
///
/// # Returns
/// * `PrometheusHandle` - Used by `/metrics` to render the exposition text
pub fn setup_metrics() -> Result<PrometheusHandle> {
    // 1ms .. 10s
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(UPSTREAM_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(REDIS_OPERATION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_counter!(UPSTREAM_REQUESTS_TOTAL, "Calls made to the store API");
    describe_histogram!(
        UPSTREAM_REQUEST_DURATION_SECONDS,
        "Store API call latency in seconds"
    );
    describe_histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "Redis operation latency in seconds"
    );
    describe_gauge!(INVENTORY_STOCK_LEVEL, "Available stock for each SKU");
    describe_gauge!(
        INVENTORY_LOW_STOCK_ITEMS,
        "Number of items at or below their reorder level"
    );
    describe_counter!(STOCK_ADJUSTMENTS_TOTAL, "Stock adjustments sent to the store API");
    describe_counter!(SYNC_RUNS_TOTAL, "Inventory reconciliation runs");
    describe_counter!(
        ORDER_SYNC_FAILURES_TOTAL,
        "Order line items the order sync failed to apply"
    );
    describe_counter!(PAYMENT_DECISIONS_TOTAL, "Payment verification decisions");

    Ok(handle)
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record an HTTP request served by the gateway
pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record one store API call. `status` is 0 when the call never got a response.
pub fn record_upstream_request(route: &'static str, status: u16, duration_secs: f64) {
    counter!(
        UPSTREAM_REQUESTS_TOTAL,
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(UPSTREAM_REQUEST_DURATION_SECONDS, "route" => route).record(duration_secs);
}

pub fn record_redis_operation(operation: &'static str, duration_secs: f64) {
    histogram!(REDIS_OPERATION_DURATION_SECONDS, "operation" => operation).record(duration_secs);
}

pub fn set_stock_level(sku: &str, warehouse: &str, level: i64) {
    gauge!(
        INVENTORY_STOCK_LEVEL,
        "sku" => sku.to_string(),
        "warehouse" => warehouse.to_string()
    )
    .set(level as f64);
}

pub fn set_low_stock_count(count: usize) {
    gauge!(INVENTORY_LOW_STOCK_ITEMS).set(count as f64);
}

/// `source` is "manual" or "order_sync"
pub fn record_stock_adjustment(source: &'static str, success: bool) {
    let status = if success { "success" } else { "failed" };
    counter!(STOCK_ADJUSTMENTS_TOTAL, "source" => source, "status" => status).increment(1);
}

/// `kind` is "inventory" or "orders"
pub fn record_sync_run(kind: &'static str, success: bool) {
    let status = if success { "success" } else { "failed" };
    counter!(SYNC_RUNS_TOTAL, "kind" => kind, "status" => status).increment(1);
}

pub fn record_order_sync_failures(count: usize) {
    counter!(ORDER_SYNC_FAILURES_TOTAL).increment(count as u64);
}

pub fn record_payment_decision(decision: &'static str) {
    counter!(PAYMENT_DECISIONS_TOTAL, "decision" => decision).increment(1);
}
