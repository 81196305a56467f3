//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pool_core::LedgerError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Exact remaining capacity, present on capacity rejections so the
    /// caller can retry with a smaller amount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, remaining) = match &self {
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None)
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            ApiError::Ledger(err) => ledger_error_parts(err),
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            remaining,
        };

        (status, Json(body)).into_response()
    }
}

/// Map a ledger error to HTTP status, code string, message, and the
/// optional remaining-capacity payload.
fn ledger_error_parts(err: &LedgerError) -> (StatusCode, &'static str, String, Option<u64>) {
    let message = err.to_string();
    match err {
        LedgerError::InvalidSpec { .. } => {
            (StatusCode::BAD_REQUEST, "INVALID_SPEC", message, None)
        }
        LedgerError::InvalidAmount { .. } => {
            (StatusCode::BAD_REQUEST, "INVALID_AMOUNT", message, None)
        }
        LedgerError::BelowMinimum { .. } => {
            (StatusCode::BAD_REQUEST, "BELOW_MINIMUM", message, None)
        }
        LedgerError::PoolNotFound { .. } => {
            (StatusCode::NOT_FOUND, "POOL_NOT_FOUND", message, None)
        }
        LedgerError::InvestmentNotFound { .. } => {
            (StatusCode::NOT_FOUND, "INVESTMENT_NOT_FOUND", message, None)
        }
        LedgerError::PoolNotActive { .. } => {
            (StatusCode::CONFLICT, "POOL_NOT_ACTIVE", message, None)
        }
        LedgerError::CapacityExceeded { remaining, .. } => (
            StatusCode::CONFLICT,
            "CAPACITY_EXCEEDED",
            message,
            Some(*remaining),
        ),
        LedgerError::InvalidStateTransition { .. } => (
            StatusCode::CONFLICT,
            "INVALID_STATE_TRANSITION",
            message,
            None,
        ),
        LedgerError::InvestmentNotMatured { .. } => {
            (StatusCode::CONFLICT, "NOT_MATURED", message, None)
        }
        LedgerError::AlreadyRedeemed { .. } => {
            (StatusCode::CONFLICT, "ALREADY_REDEEMED", message, None)
        }
        LedgerError::NotInvestmentOwner { .. } => {
            (StatusCode::FORBIDDEN, "NOT_OWNER", message, None)
        }
        LedgerError::IdempotencyKeyCollision { .. } => {
            (StatusCode::CONFLICT, "IDEMPOTENCY_COLLISION", message, None)
        }
        LedgerError::LockTimeout { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "LOCK_TIMEOUT",
            message,
            None,
        ),
        LedgerError::ArithmeticOverflow { .. }
        | LedgerError::InvariantViolation { .. }
        | LedgerError::Storage(_)
        | LedgerError::Serialization(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            message,
            None,
        ),
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pool_core::types::PoolId;

    #[test]
    fn test_capacity_exceeded_carries_remaining() {
        let (status, code, _, remaining) = ledger_error_parts(&LedgerError::CapacityExceeded {
            requested: 500,
            remaining: 120,
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "CAPACITY_EXCEEDED");
        assert_eq!(remaining, Some(120));
    }

    #[test]
    fn test_lock_timeout_is_retryable_status() {
        let (status, code, _, _) = ledger_error_parts(&LedgerError::LockTimeout {
            pool_id: PoolId::new("pool:1"),
            waited_ms: 5_000,
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "LOCK_TIMEOUT");
    }
}
