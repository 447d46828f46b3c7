// =============================================================================
// INVENTORY SYNC MODULE
// =============================================================================
// Two reconciliation paths:
//
// 1. Order-driven sync: orders updated since the last run are turned into
//    signed stock deltas (see `rules::order_stock_deltas`) and applied one
//    line item at a time. Best effort: a failing item is recorded in the
//    report and the batch carries on. No rollback, no retry.
//
// 2. Backend reconciliation (`POST /inventory/sync`): asks the store API to
//    realign inventory with product stock, then refreshes the stock gauges
//    after a short delay.
//
// Both paths share one Redis lock so only one runs at a time. The order sync
// keeps extending it while it works and stops if it is ever lost.
// =============================================================================

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::{Coordination, LockGuard, RECONCILE_LOCK};
use crate::client::{StoreClient, StoreResult};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{InventoryItem, StockAdjustment, SyncFailure, SyncReport};
use crate::rules::{self, RuleViolation};
use crate::AppState;

/// Window used when no previous run is recorded
pub fn default_window() -> ChronoDuration {
    ChronoDuration::hours(1)
}

/// Lower bound of the next run's `updatedSince` filter
pub fn window_start(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    last_run.unwrap_or(now - default_window())
}

// =============================================================================
// ORDER-DRIVEN SYNC
// =============================================================================
/// Apply stock movements for every order updated since `since`.
///
/// Fails as a whole only if the orders or the inventory listing cannot be
/// fetched; per-item failures end up in `SyncReport::failures`.
pub async fn sync_orders_with_inventory(
    client: &StoreClient,
    token: &str,
    since: DateTime<Utc>,
) -> StoreResult<SyncReport> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4();

    let orders = client.orders_updated_since(token, since).await?;
    tracing::info!(run_id = %run_id, since = %since, orders = orders.len(), "Order sync started");

    let mut report = SyncReport {
        run_id,
        started_at,
        finished_at: started_at,
        since,
        orders_scanned: orders.len(),
        adjustments_applied: 0,
        skipped_items: 0,
        failures: Vec::new(),
    };

    if orders.is_empty() {
        report.finished_at = Utc::now();
        return Ok(report);
    }

    // One listing per run, indexed by product id. Quantities are kept
    // current as adjustments land so later lines see earlier ones.
    let mut by_product: HashMap<String, InventoryItem> = client
        .all_inventory(token)
        .await?
        .into_iter()
        .map(|item| (item.product.id().to_string(), item))
        .collect();

    for order in &orders {
        let deltas = rules::order_stock_deltas(order);
        report.skipped_items += order.items.len() - deltas.len();

        let label = order.order_number.as_deref().unwrap_or(&order.id);

        for delta in deltas {
            let Some(item) = by_product.get_mut(&delta.product_id) else {
                report.failures.push(SyncFailure {
                    order_id: delta.order_id,
                    product_id: delta.product_id,
                    delta: delta.delta,
                    error: "No inventory record for product".to_string(),
                });
                continue;
            };

            let resulting = item.quantity_available.saturating_add(delta.delta);
            if resulting < 0 {
                let violation = RuleViolation::NegativeStock {
                    delta: delta.delta,
                    resulting,
                };
                report.failures.push(SyncFailure {
                    order_id: delta.order_id,
                    product_id: delta.product_id,
                    delta: delta.delta,
                    error: violation.to_string(),
                });
                continue;
            }

            let adjustment = StockAdjustment {
                adjustment: delta.delta,
                reason: delta.reason.to_string(),
                notes: Some(format!("Order {}", label)),
            };

            match client.adjust_stock(token, &item.id, &adjustment).await {
                Ok(updated) => {
                    item.quantity_available = updated.quantity_available;
                    report.adjustments_applied += 1;
                    metrics::record_stock_adjustment("order_sync", true);
                }
                Err(err) => {
                    tracing::warn!(
                        run_id = %run_id,
                        order_id = %delta.order_id,
                        inventory_id = %item.id,
                        delta = delta.delta,
                        error = %err,
                        "Order sync adjustment failed"
                    );
                    metrics::record_stock_adjustment("order_sync", false);
                    report.failures.push(SyncFailure {
                        order_id: delta.order_id,
                        product_id: delta.product_id,
                        delta: delta.delta,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    report.finished_at = Utc::now();
    metrics::record_order_sync_failures(report.failures.len());

    tracing::info!(
        run_id = %run_id,
        applied = report.adjustments_applied,
        failed = report.failures.len(),
        skipped = report.skipped_items,
        "Order sync finished"
    );

    Ok(report)
}

/// Shortest interval between lock extensions
const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

async fn take_reconcile_lock<C: Coordination>(store: &C, ttl: Duration) -> AppResult<LockGuard> {
    store
        .try_lock(RECONCILE_LOCK, ttl)
        .await?
        .ok_or_else(|| AppError::Conflict("An inventory sync is already running".to_string()))
}

async fn release_lock<C: Coordination>(store: &C, guard: LockGuard) {
    if let Err(err) = store.release(guard).await {
        tracing::warn!(error = %err, "Failed to release sync lock");
    }
}

/// Drive `work` to completion while extending `guard` every third of `ttl`.
///
/// If the lock is found expired the work is dropped, so no further
/// adjustments are sent once another replica may have taken over.
async fn while_holding<C, F>(store: &C, guard: &LockGuard, ttl: Duration, work: F) -> AppResult<F::Output>
where
    C: Coordination,
    F: Future,
{
    tokio::pin!(work);
    let mut heartbeat = tokio::time::interval((ttl / 3).max(MIN_HEARTBEAT));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            output = &mut work => return Ok(output),
            _ = heartbeat.tick() => {
                if !store.extend(guard, ttl).await? {
                    tracing::error!(key = guard.key(), "Sync lock expired mid-run, stopping");
                    return Err(AppError::Conflict(
                        "The sync lock expired before the run finished; the run was stopped"
                            .to_string(),
                    ));
                }
            }
        }
    }
}

/// One order sync run under the reconciliation lock.
///
/// The checkpoint moves to the run's start time only when the run
/// completes, so orders touched mid-run are picked up next time.
pub async fn run_order_sync(state: &AppState, token: &str) -> AppResult<SyncReport> {
    run_order_sync_with(&state.client, &state.cache, state.config.sync_lock_ttl, token).await
}

pub(crate) async fn run_order_sync_with<C: Coordination>(
    client: &StoreClient,
    store: &C,
    lock_ttl: Duration,
    token: &str,
) -> AppResult<SyncReport> {
    let guard = take_reconcile_lock(store, lock_ttl).await?;

    let result = async {
        let last_run = store.last_order_sync().await?;
        let since = window_start(last_run, Utc::now());

        let work = sync_orders_with_inventory(client, token, since);
        let report = while_holding(store, &guard, lock_ttl, work).await??;

        store.set_last_order_sync(report.started_at).await?;
        store.set_last_sync_report(&report).await?;
        Ok::<_, AppError>(report)
    }
    .await;

    release_lock(store, guard).await;
    metrics::record_sync_run("orders", result.is_ok());
    result
}

/// Run the order sync every `every` with the service token
pub fn spawn_order_sync_loop(state: Arc<AppState>, token: String, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; wait one full period instead
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match run_order_sync(&state, &token).await {
                Ok(report) => tracing::debug!(
                    run_id = %report.run_id,
                    applied = report.adjustments_applied,
                    "Scheduled order sync done"
                ),
                Err(AppError::Conflict(_)) => {
                    tracing::debug!("Scheduled order sync skipped, another sync is running")
                }
                Err(err) => tracing::error!(error = %err, "Scheduled order sync failed"),
            }
        }
    });
}

// =============================================================================
// BACKEND RECONCILIATION
// =============================================================================
/// Trigger `POST /inventory/sync` under the reconciliation lock
pub async fn reconcile_inventory(state: &AppState, token: String) -> AppResult<Value> {
    reconcile_inventory_with(
        &state.client,
        &state.cache,
        state.config.sync_lock_ttl,
        state.config.sync_refresh_delay,
        token,
    )
    .await
}

pub(crate) async fn reconcile_inventory_with<C: Coordination>(
    client: &StoreClient,
    store: &C,
    lock_ttl: Duration,
    refresh_delay: Duration,
    token: String,
) -> AppResult<Value> {
    let guard = take_reconcile_lock(store, lock_ttl).await?;
    let result = client.sync_inventory(&token).await;
    release_lock(store, guard).await;
    metrics::record_sync_run("inventory", result.is_ok());

    let summary = result?;
    tracing::info!("Inventory reconciliation finished");

    // Refetch after the backend has settled
    let client = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(refresh_delay).await;
        if let Err(err) = refresh_inventory_gauges(&client, &token).await {
            tracing::warn!(error = %err, "Post-sync inventory refresh failed");
        }
    });

    Ok(summary)
}

/// Reload stats and the low-stock list and publish them as gauges
pub async fn refresh_inventory_gauges(client: &StoreClient, token: &str) -> StoreResult<()> {
    let stats = client.inventory_stats(token).await?;
    let low_stock = client.low_stock_items(token).await?;

    let total_items = stats
        .get("totalItems")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or_default();

    metrics::set_low_stock_count(low_stock.len());
    for item in &low_stock {
        metrics::set_stock_level(&item.sku, &item.location.warehouse, item.quantity_available);
    }

    tracing::debug!(
        low_stock = low_stock.len(),
        total_items,
        "Inventory gauges refreshed"
    );
    Ok(())
}
