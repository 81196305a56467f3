//! Ledger error types
//!
//! Every fallible operation returns one of these as a typed result; nothing
//! is thrown across the pool boundary as an untyped failure.
//!
//! Taxonomy:
//! - validation errors (`InvalidSpec`, `InvalidAmount`) are caught before any
//!   ledger state is touched;
//! - state errors (`PoolNotActive`, `PoolNotFound`, `InvalidStateTransition`)
//!   mean the request is inapplicable, not that anything is broken;
//! - `CapacityExceeded` is expected and frequent, and carries the exact
//!   remaining capacity so a caller can retry with a smaller amount;
//! - `ArithmeticOverflow` and `InvariantViolation` are bugs or
//!   misconfigurations and abort the operation with full context;
//! - `LockTimeout` means the request was never applied and is safe to retry.

use thiserror::Error;

use crate::types::{
    IdempotencyKey, InvestmentId, PoolId, PoolStatus, RejectionReason, Timestamp,
};

/// Ledger result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Pool spec failed validation at creation time
    #[error("Invalid pool spec: {reason}")]
    InvalidSpec { reason: String },

    /// Malformed input, rejected before touching ledger state
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// No pool registered under this id
    #[error("Pool {pool_id} not found")]
    PoolNotFound { pool_id: PoolId },

    /// Pool exists but is not accepting investments
    #[error("Pool {pool_id} is not active (status: {status})")]
    PoolNotActive { pool_id: PoolId, status: PoolStatus },

    /// Investment below the pool's per-transaction minimum
    #[error("Amount {amount} below pool minimum {minimum}")]
    BelowMinimum { amount: u64, minimum: u64 },

    /// Request does not fit the remaining capacity; never partially filled
    #[error("Capacity exceeded: requested {requested}, remaining {remaining}")]
    CapacityExceeded { requested: u64, remaining: u64 },

    /// Disallowed lifecycle transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// No investment recorded under this id
    #[error("Investment {investment_id} not found")]
    InvestmentNotFound { investment_id: InvestmentId },

    /// Redemption attempted before the investment matured
    #[error("Investment {investment_id} not matured until {maturity_at}")]
    InvestmentNotMatured {
        investment_id: InvestmentId,
        maturity_at: Timestamp,
    },

    /// Redemption attempted twice
    #[error("Investment {investment_id} already redeemed")]
    AlreadyRedeemed { investment_id: InvestmentId },

    /// Redemption attempted by someone other than the investment's owner
    #[error("Investor {investor} does not own investment {investment_id}")]
    NotInvestmentOwner {
        investment_id: InvestmentId,
        investor: crate::types::InvestorId,
    },

    /// Same idempotency key replayed with different request parameters
    #[error("Idempotency key {key} already used with different parameters")]
    IdempotencyKeyCollision { key: IdempotencyKey },

    /// Intermediate or final money arithmetic overflowed; never clamped
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// Per-pool critical section could not be acquired within the bounded
    /// wait; the request was not applied and is safe to retry
    #[error("Lock acquisition timed out for pool {pool_id} after {waited_ms}ms")]
    LockTimeout { pool_id: PoolId, waited_ms: u64 },

    /// Storage layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization failure in the storage layer
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal invariant broken; unrecoverable bug path
    #[error("Invariant violation: {invariant} - {details}")]
    InvariantViolation { invariant: String, details: String },
}

impl LedgerError {
    /// Typed rejection reason for errors that should still produce an audit
    /// record (an `Investment` with status `Rejected`).
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            LedgerError::PoolNotActive { status, .. } => {
                Some(RejectionReason::PoolNotActive { status: *status })
            }
            LedgerError::BelowMinimum { amount, minimum } => Some(RejectionReason::BelowMinimum {
                amount: *amount,
                minimum: *minimum,
            }),
            LedgerError::CapacityExceeded {
                requested,
                remaining,
            } => Some(RejectionReason::CapacityExceeded {
                requested: *requested,
                remaining: *remaining,
            }),
            _ => None,
        }
    }

    /// Whether a caller may safely retry the exact same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::LockTimeout { .. } | LedgerError::Storage(_)
        )
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_mapping() {
        let err = LedgerError::CapacityExceeded {
            requested: 500,
            remaining: 200,
        };
        assert_eq!(
            err.rejection_reason(),
            Some(RejectionReason::CapacityExceeded {
                requested: 500,
                remaining: 200,
            })
        );

        let err = LedgerError::PoolNotActive {
            pool_id: PoolId::new("pool:1"),
            status: PoolStatus::Draft,
        };
        assert!(matches!(
            err.rejection_reason(),
            Some(RejectionReason::PoolNotActive { .. })
        ));

        let err = LedgerError::InvalidAmount {
            reason: "zero".to_string(),
        };
        assert_eq!(err.rejection_reason(), None);
    }

    #[test]
    fn test_retryable() {
        assert!(LedgerError::LockTimeout {
            pool_id: PoolId::new("pool:1"),
            waited_ms: 5000,
        }
        .is_retryable());
        assert!(!LedgerError::BelowMinimum {
            amount: 1,
            minimum: 10,
        }
        .is_retryable());
    }
}
