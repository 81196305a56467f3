//! Notification capability
//!
//! Side effects that follow an accepted transaction (badge issuance, UI
//! pushes) happen strictly after the per-pool critical section, through this
//! boundary. A sink failure is logged and swallowed by the caller; it never
//! rolls back an accepted investment.

use async_trait::async_trait;

use crate::error::LedgerResult;
use crate::types::{
    InvestmentId, InvestmentReceipt, InvestorId, Milestone, PoolId, RejectionReason,
};

/// Events emitted by the ledger after a transaction commits
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    InvestmentAccepted {
        receipt: InvestmentReceipt,
    },
    InvestmentRejected {
        investment_id: InvestmentId,
        pool_id: PoolId,
        investor: InvestorId,
        reason: RejectionReason,
    },
    PoolFunded {
        pool_id: PoolId,
        total_raised: u64,
    },
    PoolMatured {
        pool_id: PoolId,
    },
    MilestoneGranted {
        investor: InvestorId,
        milestone: Milestone,
    },
    InvestmentRedeemed {
        investment_id: InvestmentId,
        investor: InvestorId,
        payout: u64,
    },
}

/// Notification sink interface
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, event: LedgerEvent) -> LedgerResult<()>;
}

/// Default sink: structured log lines, nothing else
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn publish(&self, event: LedgerEvent) -> LedgerResult<()> {
        match &event {
            LedgerEvent::InvestmentAccepted { receipt } => {
                tracing::info!(
                    pool_id = %receipt.pool_id,
                    investor = %receipt.investor,
                    amount = receipt.amount,
                    ordinal = receipt.ordinal,
                    "Investment accepted"
                );
            }
            LedgerEvent::InvestmentRejected {
                pool_id,
                investor,
                reason,
                ..
            } => {
                tracing::warn!(
                    pool_id = %pool_id,
                    investor = %investor,
                    reason = %reason,
                    "Investment rejected"
                );
            }
            LedgerEvent::PoolFunded {
                pool_id,
                total_raised,
            } => {
                tracing::info!(pool_id = %pool_id, total_raised, "Pool fully funded");
            }
            LedgerEvent::PoolMatured { pool_id } => {
                tracing::info!(pool_id = %pool_id, "Pool matured");
            }
            LedgerEvent::MilestoneGranted {
                investor,
                milestone,
            } => {
                tracing::info!(investor = %investor, milestone = %milestone, "Milestone granted");
            }
            LedgerEvent::InvestmentRedeemed {
                investment_id,
                investor,
                payout,
            } => {
                tracing::info!(
                    investment_id = %investment_id,
                    investor = %investor,
                    payout,
                    "Investment redeemed"
                );
            }
        }
        Ok(())
    }
}
