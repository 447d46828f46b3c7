// =============================================================================
// ERROR MODULE
// =============================================================================
// Error types and their HTTP responses.
//
// TWO LAYERS:
// - StoreError: what went wrong talking to the store backend
// - AppError: everything a handler can fail with, mapped to a status code
//   and a JSON body `{ error, message, details? }`
//
// The messages on backend failures are the ones the dashboard shows
// verbatim (session expired, file too large, throttled, try again).
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::{ErrorResponse, FieldError};
use crate::rules::RuleViolation;

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired, please log in again";
pub const TOO_LARGE_MESSAGE: &str =
    "File is too large. Compress the image or video, or upload a smaller file";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please wait a moment and try again";
pub const RETRY_MESSAGE: &str = "The store service is having trouble, please try again";

// =============================================================================
// STORE BACKEND ERRORS
// =============================================================================
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure: connection refused, timeout, TLS, ...
    #[error("Store API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store API rejected the credentials")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 400 with the structured `[{field, message}]` array, already flattened
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Rate limited by store API")]
    RateLimited,

    #[error("Store API returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// 2xx response whose body did not have the expected shape
    #[error("Unexpected response from store API: {0}")]
    Decode(String),
}

/// Flatten backend validation details into one readable line
///
/// # Example
/// `[{field: "name", message: "required"}]` → `"name: required"`
pub fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// APPLICATION ERROR
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // BUSINESS RULES
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    // -------------------------------------------------------------------------
    // DEPENDENCIES
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),

    // -------------------------------------------------------------------------
    // REQUEST ERRORS
    // -------------------------------------------------------------------------
    /// No bearer token on a protected route
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent or repeated operation (sync in flight, decision in flight)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl AppError {
    /// Status code, machine-readable code and client-facing message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Rule(violation) => {
                let status = match violation {
                    RuleViolation::DuplicateSlug(_)
                    | RuleViolation::IllegalTransition { .. }
                    | RuleViolation::AlreadyDecided(_) => StatusCode::CONFLICT,
                    RuleViolation::AdminNotDeletable => StatusCode::FORBIDDEN,
                    _ => StatusCode::BAD_REQUEST,
                };
                let code = if status == StatusCode::BAD_REQUEST {
                    "VALIDATION_ERROR"
                } else if status == StatusCode::FORBIDDEN {
                    "FORBIDDEN"
                } else {
                    "CONFLICT"
                };
                (status, code, violation.to_string())
            }

            AppError::Store(err) => match err {
                StoreError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    SESSION_EXPIRED_MESSAGE.to_string(),
                ),
                StoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                StoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
                StoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                StoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                StoreError::PayloadTooLarge => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PAYLOAD_TOO_LARGE",
                    TOO_LARGE_MESSAGE.to_string(),
                ),
                StoreError::RateLimited => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    RATE_LIMITED_MESSAGE.to_string(),
                ),
                // Don't leak backend internals to the dashboard
                StoreError::Upstream { .. } | StoreError::Decode(_) => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    RETRY_MESSAGE.to_string(),
                ),
                StoreError::Transport(_) => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAVAILABLE",
                    RETRY_MESSAGE.to_string(),
                ),
            },

            AppError::Redis(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CACHE_ERROR",
                "A cache error occurred".to_string(),
            ),

            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                message = %message,
                "Request rejected"
            );
        }

        let body = match &self {
            // Keep the upstream status for the dashboard's error panel
            AppError::Store(StoreError::Upstream { status, .. }) => ErrorResponse::with_details(
                error_code,
                message,
                format!("store API status {}", status),
            ),
            _ => ErrorResponse::new(error_code, message),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_are_flattened() {
        let errors = vec![
            FieldError {
                field: "name".into(),
                message: "is required".into(),
            },
            FieldError {
                field: "price.selling".into(),
                message: "must be positive".into(),
            },
        ];
        assert_eq!(
            format_field_errors(&errors),
            "name: is required; price.selling: must be positive"
        );
        assert_eq!(format_field_errors(&[]), "");
    }

    #[test]
    fn rule_violations_map_to_client_errors() {
        let bad = AppError::from(RuleViolation::ZeroAdjustment);
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let conflict = AppError::from(RuleViolation::AlreadyDecided("verified"));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let forbidden = AppError::from(RuleViolation::AdminNotDeletable);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn gateway_validation_shares_one_code() {
        let (status, code, _) = AppError::from(RuleViolation::ZeroAdjustment).parts();
        assert_eq!((status, code), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));

        let (status, code, message) =
            AppError::BadRequest("Pass confirm=true".to_string()).parts();
        assert_eq!((status, code), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));
        assert_eq!(message, "Pass confirm=true");
    }

    #[test]
    fn store_errors_keep_the_dashboard_taxonomy() {
        assert_eq!(
            AppError::from(StoreError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(StoreError::PayloadTooLarge).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::from(StoreError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::from(StoreError::Upstream {
                status: 500,
                message: "boom".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(StoreError::Validation("name: required".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn session_expiry_message_is_user_facing() {
        let (_, code, message) = AppError::from(StoreError::Unauthorized).parts();
        assert_eq!(code, "UNAUTHORIZED");
        assert_eq!(message, SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn upstream_failures_hide_backend_messages() {
        let (_, _, message) = AppError::from(StoreError::Upstream {
            status: 500,
            message: "NullPointerException at ...".into(),
        })
        .parts();
        assert_eq!(message, RETRY_MESSAGE);
    }
}
