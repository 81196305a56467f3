//! Ledger service
//!
//! Facade wiring the registry, allocator, tier engine, and store behind the
//! functional surface the API layer consumes. Investor identity is always an
//! explicit argument; there is no ambient session state anywhere below this
//! line.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::achievement::AchievementTierEngine;
use crate::allocator::InvestmentAllocator;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::PoolRegistry;
use crate::notify::{LedgerEvent, NotificationSink, TracingSink};
use crate::store::InvestmentStore;
use crate::types::{
    AchievementRecord, IdempotencyKey, Investment, InvestmentId, InvestmentReceipt, InvestorId,
    Milestone, PoolId, PoolSnapshot, PoolSpec, PoolStatus, Redemption, Timestamp,
};

/// Result of one maturity sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaturitySweep {
    pub pools_matured: u64,
    pub investments_matured: u64,
}

/// Platform-wide aggregate view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub total_pools: u64,
    pub active_pools: u64,
    pub funded_pools: u64,
    pub matured_pools: u64,
    pub total_raised: u64,
    pub total_investors: u64,
    pub total_investments: u64,
    pub rejected_investments: u64,
}

/// Ledger service
pub struct LedgerService {
    registry: Arc<PoolRegistry>,
    allocator: InvestmentAllocator,
    store: Arc<dyn InvestmentStore>,
    notifier: Arc<dyn NotificationSink>,
    tier_engine: AchievementTierEngine,
}

impl LedgerService {
    pub fn new(
        config: LedgerConfig,
        store: Arc<dyn InvestmentStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let registry = Arc::new(PoolRegistry::new(&config));
        let allocator = InvestmentAllocator::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&notifier),
            &config,
        );

        Self {
            registry,
            allocator,
            store,
            notifier,
            tier_engine: AchievementTierEngine::from_config(&config),
        }
    }

    /// Service with the default tracing notification sink.
    pub fn with_defaults(config: LedgerConfig, store: Arc<dyn InvestmentStore>) -> Self {
        Self::new(config, store, Arc::new(TracingSink))
    }

    // ==================== Pools ====================

    /// Create a pool in `Draft`; grants the Creator milestone when the spec
    /// names a creator.
    pub async fn create_pool(&self, spec: PoolSpec) -> LedgerResult<PoolId> {
        let creator = spec.creator.clone();
        let pool_id = self.registry.create_pool(spec, Timestamp::now()).await?;

        if let Some(creator) = creator {
            self.grant(&creator, Milestone::Creator).await;
        }

        Ok(pool_id)
    }

    pub async fn activate_pool(&self, pool_id: &PoolId) -> LedgerResult<PoolSnapshot> {
        let ledger = self.registry.require(pool_id).await?;
        ledger.activate(Timestamp::now()).await
    }

    pub async fn cancel_pool(&self, pool_id: &PoolId) -> LedgerResult<PoolSnapshot> {
        let ledger = self.registry.require(pool_id).await?;
        ledger.cancel().await
    }

    pub async fn get_pool(&self, pool_id: &PoolId) -> LedgerResult<PoolSnapshot> {
        let ledger = self.registry.require(pool_id).await?;
        ledger.snapshot().await
    }

    pub async fn list_pools(
        &self,
        status: Option<PoolStatus>,
    ) -> LedgerResult<Vec<PoolSnapshot>> {
        self.registry.list_by_status(status).await
    }

    // ==================== Investments ====================

    /// Submit one investment; see `InvestmentAllocator::invest`.
    pub async fn invest(
        &self,
        pool_id: &PoolId,
        investor: &InvestorId,
        amount: u64,
        idempotency_key: &IdempotencyKey,
    ) -> LedgerResult<InvestmentReceipt> {
        self.allocator
            .invest(pool_id, investor, amount, idempotency_key)
            .await
    }

    pub async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Investment> {
        self.store
            .get_investment(id)
            .await?
            .ok_or_else(|| LedgerError::InvestmentNotFound {
                investment_id: id.clone(),
            })
    }

    /// All records for one investor, rejected ones included. Read-only and
    /// eventually consistent with respect to in-flight transactions.
    pub async fn list_investments_by_investor(
        &self,
        investor: &InvestorId,
    ) -> LedgerResult<Vec<Investment>> {
        self.store.list_by_investor(investor).await
    }

    pub async fn redeem(
        &self,
        investment_id: &InvestmentId,
        investor: &InvestorId,
    ) -> LedgerResult<Redemption> {
        self.allocator
            .redeem(investment_id, investor, Timestamp::now())
            .await
    }

    // ==================== Maturity ====================

    /// Walk `Active|Funded` pools, apply `check_maturity`, and mark the
    /// accepted investments of freshly matured pools. Idempotent.
    pub async fn sweep_maturity(&self) -> LedgerResult<MaturitySweep> {
        self.sweep_maturity_at(Timestamp::now()).await
    }

    /// Sweep against an explicit clock; the public entry passes wall time.
    pub async fn sweep_maturity_at(&self, now: Timestamp) -> LedgerResult<MaturitySweep> {
        let mut sweep = MaturitySweep::default();

        for ledger in self.registry.list_all().await {
            if ledger.check_maturity(now).await? {
                sweep.pools_matured += 1;
                sweep.investments_matured += self
                    .store
                    .mature_pool_investments(ledger.id())
                    .await?;
                self.publish(LedgerEvent::PoolMatured {
                    pool_id: ledger.id().clone(),
                })
                .await;
            }
        }

        if sweep.pools_matured > 0 {
            tracing::info!(
                pools = sweep.pools_matured,
                investments = sweep.investments_matured,
                "Maturity sweep applied"
            );
        }
        Ok(sweep)
    }

    // ==================== Achievements ====================

    /// Explicit session connect; grants `WelcomeConnected`.
    pub async fn connect_investor(&self, investor: &InvestorId) -> LedgerResult<AchievementRecord> {
        self.grant(investor, Milestone::WelcomeConnected).await;
        self.achievements(investor).await
    }

    /// Derived achievement view: tier from cumulative accepted investment,
    /// plus the investor's append-only milestone flags.
    pub async fn achievements(&self, investor: &InvestorId) -> LedgerResult<AchievementRecord> {
        let cumulative = self.store.cumulative_invested(investor).await?;
        let milestones: BTreeSet<Milestone> = self.store.milestones(investor).await?;
        Ok(self
            .tier_engine
            .record(investor.clone(), cumulative, milestones))
    }

    // ==================== Stats ====================

    pub async fn platform_stats(&self) -> LedgerResult<PlatformStats> {
        let registry = self.registry.stats().await?;
        let store = self.store.stats().await?;
        let total_investors = self.store.distinct_investors().await?;

        Ok(PlatformStats {
            total_pools: registry.total_pools,
            active_pools: registry.active_pools,
            funded_pools: registry.funded_pools,
            matured_pools: registry.matured_pools,
            total_raised: registry.total_raised,
            total_investors,
            total_investments: store.total_investments,
            rejected_investments: store.rejected_investments,
        })
    }

    async fn grant(&self, investor: &InvestorId, milestone: Milestone) {
        match self.store.grant_milestone(investor, milestone).await {
            Ok(true) => {
                self.publish(LedgerEvent::MilestoneGranted {
                    investor: investor.clone(),
                    milestone,
                })
                .await;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    investor = %investor,
                    milestone = %milestone,
                    error = %err,
                    "Milestone grant failed"
                );
            }
        }
    }

    async fn publish(&self, event: LedgerEvent) {
        if let Err(err) = self.notifier.publish(event).await {
            tracing::warn!(error = %err, "Notification sink failure");
        }
    }
}
