//! Storage capability boundary
//!
//! The ledger core depends on this trait for persistence; implementations
//! live in `pool-store`. Requirements:
//!
//! - investments are append-only: rejected attempts are retained for audit,
//!   accepted records only ever walk `active -> matured -> redeemed`;
//! - dedup is keyed by `(pool_id, idempotency_key)`;
//! - milestone grants are append-only flags.
//!
//! No implementation may be called while a per-pool critical section is
//! held; the allocator persists before or after the lock, never inside it.

pub mod memory;
pub mod sled;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::LedgerResult;
use crate::types::{
    IdempotencyKey, Investment, InvestmentId, InvestorId, Milestone, PoolId, Timestamp,
};

/// Investment store interface
#[async_trait]
pub trait InvestmentStore: Send + Sync {
    // ==================== Investment records ====================

    /// Insert or update an investment record.
    async fn save_investment(&self, investment: &Investment) -> LedgerResult<()>;

    /// Fetch a record by id.
    async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Option<Investment>>;

    /// Fetch the record saved under `(pool_id, idempotency_key)`.
    async fn get_by_idempotency_key(
        &self,
        pool_id: &PoolId,
        key: &IdempotencyKey,
    ) -> LedgerResult<Option<Investment>>;

    /// All records (including rejected) for one investor.
    async fn list_by_investor(&self, investor: &InvestorId) -> LedgerResult<Vec<Investment>>;

    /// All records (including rejected) for one pool.
    async fn list_by_pool(&self, pool_id: &PoolId) -> LedgerResult<Vec<Investment>>;

    // ==================== Atomic status walks ====================

    /// Atomically mark an investment redeemed.
    ///
    /// Fails with `AlreadyRedeemed` or `InvalidStateTransition` when the
    /// current status does not allow it; ownership and maturity checks are
    /// the caller's job (those fields are immutable).
    async fn redeem_investment(
        &self,
        id: &InvestmentId,
        now: Timestamp,
    ) -> LedgerResult<Investment>;

    /// Mark every active investment of a pool matured; returns the count.
    async fn mature_pool_investments(&self, pool_id: &PoolId) -> LedgerResult<u64>;

    // ==================== Derived queries ====================

    /// Sum of accepted (non-rejected) amounts across all pools.
    async fn cumulative_invested(&self, investor: &InvestorId) -> LedgerResult<u64>;

    /// Count of investors with at least one accepted investment.
    async fn distinct_investors(&self) -> LedgerResult<u64>;

    // ==================== Milestones ====================

    /// Grant a milestone; returns `true` when newly granted.
    async fn grant_milestone(
        &self,
        investor: &InvestorId,
        milestone: Milestone,
    ) -> LedgerResult<bool>;

    /// Milestones granted to one investor.
    async fn milestones(&self, investor: &InvestorId) -> LedgerResult<BTreeSet<Milestone>>;

    // ==================== Stats ====================

    /// Aggregate counters.
    async fn stats(&self) -> LedgerResult<StoreStats>;
}

/// Store counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_investments: u64,
    pub accepted_investments: u64,
    pub rejected_investments: u64,
    pub redeemed_investments: u64,
}

pub use self::sled::SledStore;
pub use memory::MemoryStore;
