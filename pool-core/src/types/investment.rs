//! Investment records and receipts
//!
//! An investment is immutable once accepted except for the
//! `active -> matured -> redeemed` status walk. Rejected attempts are kept
//! as records too; a failure is never silently dropped from the audit trail,
//! and a rejected record never counts toward `total_raised`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{IdempotencyKey, InvestmentId, InvestorId, PoolId, Timestamp};
use super::pool::PoolStatus;

/// Investment status
///
/// `active -> matured -> redeemed`, or terminal `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    /// Accepted, principal committed
    Active,
    /// Pool term elapsed; payout due
    Matured,
    /// Payout taken
    Redeemed,
    /// Rejected at allocation time; audit record only
    Rejected,
}

impl InvestmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Rejected)
    }

    /// Whether the record counts toward a pool's `total_raised` and an
    /// investor's cumulative total.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    pub fn can_transition_to(&self, target: InvestmentStatus) -> bool {
        match (self, target) {
            (Self::Active, Self::Matured) => true,
            // redemption checks maturity by time; the sweep may not have run
            (Self::Active, Self::Redeemed) => true,
            (Self::Matured, Self::Redeemed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Matured => write!(f, "matured"),
            Self::Redeemed => write!(f, "redeemed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Why an investment attempt was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Pool was not accepting investments
    PoolNotActive { status: PoolStatus },
    /// Below the pool's per-transaction minimum
    BelowMinimum { amount: u64, minimum: u64 },
    /// Did not fit remaining capacity; carries the exact remainder
    CapacityExceeded { requested: u64, remaining: u64 },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolNotActive { status } => write!(f, "pool_not_active:{}", status),
            Self::BelowMinimum { amount, minimum } => {
                write!(f, "below_minimum:{}<{}", amount, minimum)
            }
            Self::CapacityExceeded {
                requested,
                remaining,
            } => write!(f, "capacity_exceeded:{}>{}", requested, remaining),
        }
    }
}

/// Investment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: InvestmentId,
    pub pool_id: PoolId,
    pub investor: InvestorId,
    pub amount: u64,
    /// Dedup key; unique per pool
    pub idempotency_key: IdempotencyKey,
    pub status: InvestmentStatus,
    pub created_at: Timestamp,
    /// Set for accepted records only
    pub accepted_at: Option<Timestamp>,
    /// Principal plus interest, frozen at acceptance; never recomputed
    pub expected_return: Option<u64>,
    pub maturity_at: Option<Timestamp>,
    /// 1-based acceptance order within the pool; defines EarlySupporter
    pub ordinal: Option<u64>,
    pub redeemed_at: Option<Timestamp>,
    /// Set for rejected records only
    pub rejection_reason: Option<RejectionReason>,
}

impl Investment {
    /// Build an accepted record.
    #[allow(clippy::too_many_arguments)]
    pub fn accepted(
        id: InvestmentId,
        pool_id: PoolId,
        investor: InvestorId,
        amount: u64,
        idempotency_key: IdempotencyKey,
        accepted_at: Timestamp,
        expected_return: u64,
        maturity_at: Timestamp,
        ordinal: u64,
    ) -> Self {
        Self {
            id,
            pool_id,
            investor,
            amount,
            idempotency_key,
            status: InvestmentStatus::Active,
            created_at: accepted_at,
            accepted_at: Some(accepted_at),
            expected_return: Some(expected_return),
            maturity_at: Some(maturity_at),
            ordinal: Some(ordinal),
            redeemed_at: None,
            rejection_reason: None,
        }
    }

    /// Build a rejected audit record.
    pub fn rejected(
        id: InvestmentId,
        pool_id: PoolId,
        investor: InvestorId,
        amount: u64,
        idempotency_key: IdempotencyKey,
        reason: RejectionReason,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            pool_id,
            investor,
            amount,
            idempotency_key,
            status: InvestmentStatus::Rejected,
            created_at: now,
            accepted_at: None,
            expected_return: None,
            maturity_at: None,
            ordinal: None,
            redeemed_at: None,
            rejection_reason: Some(reason),
        }
    }

    /// Whether a replayed request carries the same parameters.
    pub fn matches_request(&self, pool_id: &PoolId, investor: &InvestorId, amount: u64) -> bool {
        &self.pool_id == pool_id && &self.investor == investor && self.amount == amount
    }

    /// Receipt for an accepted record; `None` for rejected ones.
    pub fn receipt(&self) -> Option<InvestmentReceipt> {
        match (
            self.accepted_at,
            self.expected_return,
            self.maturity_at,
            self.ordinal,
        ) {
            (Some(accepted_at), Some(expected_return), Some(maturity_at), Some(ordinal)) => {
                Some(InvestmentReceipt {
                    investment_id: self.id.clone(),
                    pool_id: self.pool_id.clone(),
                    investor: self.investor.clone(),
                    amount: self.amount,
                    expected_return,
                    accepted_at,
                    maturity_at,
                    ordinal,
                })
            }
            _ => None,
        }
    }
}

/// Receipt returned to the caller of `invest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentReceipt {
    pub investment_id: InvestmentId,
    pub pool_id: PoolId,
    pub investor: InvestorId,
    pub amount: u64,
    /// Principal plus interest due at maturity
    pub expected_return: u64,
    pub accepted_at: Timestamp,
    pub maturity_at: Timestamp,
    pub ordinal: u64,
}

/// Outcome of a redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub investment_id: InvestmentId,
    pub investor: InvestorId,
    pub payout: u64,
    pub redeemed_at: Timestamp,
}
