// =============================================================================
// PAYMENT VERIFICATION HANDLERS
// =============================================================================
// Manual review of payment proofs. A verification is decided exactly once:
// - the verification must still be pending when we look at it
// - a short Redis lock per verification stops a second decision while the
//   first one is in flight (double click, two admins)
// =============================================================================

use axum::{
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{bearer_token, observe};
use crate::cache::{verification_lock_key, Coordination};
use crate::client::StoreClient;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    ApproveVerificationRequest, ListResponse, PaymentVerification, RejectVerificationRequest,
    RejectionPayload, RejectionReason,
};
use crate::rules;
use crate::AppState;

/// Upper bound on how long one decision may hold its lock
const DECISION_LOCK_TTL: Duration = Duration::from_secs(30);

/// GET /api/v1/payment-verifications
pub async fn list_verifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> AppResult<Json<ListResponse<PaymentVerification>>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state
        .client
        .list_verifications(&token, query.as_deref())
        .await
        .map_err(AppError::from);
    observe("GET", "/api/v1/payment-verifications", start, result).map(Json)
}

/// GET /api/v1/payment-verifications/stats
pub async fn verification_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.verification_stats(&token).await.map_err(AppError::from);
    observe("GET", "/api/v1/payment-verifications/stats", start, result).map(Json)
}

/// GET /api/v1/payment-verifications/:id
pub async fn get_verification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<PaymentVerification>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let result = state.client.get_verification(&token, &id).await.map_err(AppError::from);
    observe("GET", "/api/v1/payment-verifications/:id", start, result).map(Json)
}

/// GET /api/v1/payment-verifications/rejection-reasons
pub async fn rejection_reasons(headers: HeaderMap) -> AppResult<Json<Vec<&'static str>>> {
    bearer_token(&headers)?;
    Ok(Json(
        RejectionReason::ALL.iter().map(RejectionReason::label).collect(),
    ))
}

// -----------------------------------------------------------------------------
// DECISIONS
// -----------------------------------------------------------------------------

pub(crate) async fn approve_pending(
    client: &StoreClient,
    token: &str,
    id: &str,
    request: &ApproveVerificationRequest,
) -> AppResult<PaymentVerification> {
    let current = client.get_verification(token, id).await?;
    rules::ensure_pending(&current)?;

    let decided = client.approve_verification(token, id, request).await?;
    metrics::record_payment_decision("approved");
    tracing::info!(
        verification_id = %id,
        amount = decided.amount,
        "Payment verification approved"
    );
    Ok(decided)
}

pub(crate) async fn reject_pending(
    client: &StoreClient,
    token: &str,
    id: &str,
    request: &RejectVerificationRequest,
) -> AppResult<PaymentVerification> {
    rules::validate_rejection(request)?;

    let current = client.get_verification(token, id).await?;
    rules::ensure_pending(&current)?;

    let payload = RejectionPayload {
        rejection_reason: request.reason.label().to_string(),
        admin_notes: request
            .admin_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        cancel_order: request.cancel_order,
    };

    let decided = client.reject_verification(token, id, &payload).await?;
    metrics::record_payment_decision("rejected");
    tracing::warn!(
        verification_id = %id,
        reason = request.reason.label(),
        order_cancelled = request.cancel_order,
        "Payment verification rejected"
    );
    Ok(decided)
}

/// Run `decide` while holding the verification's decision lock
pub(crate) async fn with_decision_lock<C, F>(store: &C, id: &str, decide: F) -> AppResult<PaymentVerification>
where
    C: Coordination,
    F: Future<Output = AppResult<PaymentVerification>>,
{
    let guard = store
        .try_lock(&verification_lock_key(id), DECISION_LOCK_TTL)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("This payment verification is already being decided".to_string())
        })?;

    let result = decide.await;

    if let Err(err) = store.release(guard).await {
        tracing::warn!(error = %err, "Failed to release decision lock");
    }
    result
}

/// POST /api/v1/payment-verifications/:id/approve
pub async fn approve_verification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ApproveVerificationRequest>>,
) -> AppResult<Json<PaymentVerification>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let decide = approve_pending(&state.client, &token, &id, &request);
    let result = with_decision_lock(&state.cache, &id, decide).await;

    observe("POST", "/api/v1/payment-verifications/:id/approve", start, result).map(Json)
}

/// POST /api/v1/payment-verifications/:id/reject
///
/// # Request Body
/// ```json
/// { "reason": "Amount Mismatch", "adminNotes": "paid 40, owes 45", "cancelOrder": false }
/// ```
pub async fn reject_verification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RejectVerificationRequest>,
) -> AppResult<Json<PaymentVerification>> {
    let start = Instant::now();
    let token = bearer_token(&headers)?;

    let decide = reject_pending(&state.client, &token, &id, &request);
    let result = with_decision_lock(&state.cache, &id, decide).await;

    observe("POST", "/api/v1/payment-verifications/:id/reject", start, result).map(Json)
}
