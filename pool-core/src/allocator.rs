//! Investment allocator
//!
//! Orchestrates one investment end-to-end as a single logical transaction:
//!
//! 1. validate the amount;
//! 2. resolve the pool via the registry;
//! 3. replay check on `(pool_id, idempotency_key)` — an existing
//!    non-rejected record returns its receipt unchanged, no double counting;
//! 4. reserve capacity under the per-pool lock (pure in-memory);
//! 5. persist the record (accepted with a frozen quote, or rejected for
//!    audit) outside the lock;
//! 6. grant milestones and emit notifications, also outside the lock —
//!    their failure never rolls back an accepted investment.

use std::sync::Arc;

use crate::achievement::AchievementTierEngine;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::PoolRegistry;
use crate::notify::{LedgerEvent, NotificationSink};
use crate::returns::ReturnsCalculator;
use crate::store::InvestmentStore;
use crate::types::{
    IdempotencyKey, Investment, InvestmentId, InvestmentReceipt, InvestmentStatus, InvestorId,
    Milestone, PoolId, Redemption, Timestamp,
};

/// Investment allocator
pub struct InvestmentAllocator {
    registry: Arc<PoolRegistry>,
    store: Arc<dyn InvestmentStore>,
    notifier: Arc<dyn NotificationSink>,
    tier_engine: AchievementTierEngine,
}

impl InvestmentAllocator {
    pub fn new(
        registry: Arc<PoolRegistry>,
        store: Arc<dyn InvestmentStore>,
        notifier: Arc<dyn NotificationSink>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            tier_engine: AchievementTierEngine::from_config(config),
        }
    }

    /// Apply one investment request against a pool.
    pub async fn invest(
        &self,
        pool_id: &PoolId,
        investor: &InvestorId,
        amount: u64,
        idempotency_key: &IdempotencyKey,
    ) -> LedgerResult<InvestmentReceipt> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount {
                reason: "investment amount must be positive".to_string(),
            });
        }

        let ledger = self.registry.require(pool_id).await?;

        // Idempotent replay: a non-rejected record under the same key wins
        // unconditionally; a rejected one allows a fresh attempt.
        if let Some(existing) = self
            .store
            .get_by_idempotency_key(pool_id, idempotency_key)
            .await?
        {
            if existing.status != InvestmentStatus::Rejected {
                if !existing.matches_request(pool_id, investor, amount) {
                    return Err(LedgerError::IdempotencyKeyCollision {
                        key: idempotency_key.clone(),
                    });
                }
                tracing::debug!(
                    pool_id = %pool_id,
                    investor = %investor,
                    key = %idempotency_key,
                    "Idempotent replay, returning existing receipt"
                );
                return existing.receipt().ok_or_else(|| {
                    LedgerError::InvariantViolation {
                        invariant: "accepted investment has a receipt".to_string(),
                        details: format!("investment {} has no receipt fields", existing.id),
                    }
                });
            }
        }

        // Quote from immutable pool parameters before entering the critical
        // section; an overflow here rejects the request without touching
        // ledger state.
        let now = Timestamp::now();
        let params = ledger.snapshot().await?;
        let quote = ReturnsCalculator::compute_returns(
            amount,
            params.interest_rate_bps,
            params.loan_term_secs,
            now,
        )?;

        match ledger.reserve_capacity(amount).await {
            Ok(reservation) => {
                let investment = Investment::accepted(
                    InvestmentId::generate(),
                    pool_id.clone(),
                    investor.clone(),
                    amount,
                    idempotency_key.clone(),
                    now,
                    quote.total,
                    quote.maturity_at,
                    reservation.ordinal,
                );

                let receipt = investment.receipt().ok_or_else(|| {
                    LedgerError::InvariantViolation {
                        invariant: "accepted investment has a receipt".to_string(),
                        details: format!("investment {} has no receipt fields", investment.id),
                    }
                })?;

                if let Err(err) = self.store.save_investment(&investment).await {
                    // The reservation stands (no rollback); the idempotency
                    // key makes the caller's retry safe once storage
                    // recovers.
                    tracing::error!(
                        pool_id = %pool_id,
                        investor = %investor,
                        investment_id = %investment.id,
                        error = %err,
                        "Accepted investment could not be persisted"
                    );
                    return Err(err);
                }

                self.post_acceptance(investor, &receipt, &reservation).await;

                Ok(receipt)
            }
            Err(err) => {
                // Expected rejections leave an audit record; bugs and
                // timeouts do not.
                if let Some(reason) = err.rejection_reason() {
                    let record = Investment::rejected(
                        InvestmentId::generate(),
                        pool_id.clone(),
                        investor.clone(),
                        amount,
                        idempotency_key.clone(),
                        reason.clone(),
                        now,
                    );
                    if let Err(save_err) = self.store.save_investment(&record).await {
                        tracing::warn!(
                            pool_id = %pool_id,
                            error = %save_err,
                            "Rejected investment could not be persisted for audit"
                        );
                    }
                    self.publish(LedgerEvent::InvestmentRejected {
                        investment_id: record.id.clone(),
                        pool_id: pool_id.clone(),
                        investor: investor.clone(),
                        reason,
                    })
                    .await;
                }
                Err(err)
            }
        }
    }

    /// Redeem a matured investment: pays out the frozen
    /// principal-plus-interest, once, to its owner.
    pub async fn redeem(
        &self,
        investment_id: &InvestmentId,
        investor: &InvestorId,
        now: Timestamp,
    ) -> LedgerResult<Redemption> {
        let investment = self
            .store
            .get_investment(investment_id)
            .await?
            .ok_or_else(|| LedgerError::InvestmentNotFound {
                investment_id: investment_id.clone(),
            })?;

        if &investment.investor != investor {
            return Err(LedgerError::NotInvestmentOwner {
                investment_id: investment_id.clone(),
                investor: investor.clone(),
            });
        }

        match investment.status {
            InvestmentStatus::Redeemed => {
                return Err(LedgerError::AlreadyRedeemed {
                    investment_id: investment_id.clone(),
                })
            }
            InvestmentStatus::Rejected => {
                return Err(LedgerError::InvalidStateTransition {
                    from: InvestmentStatus::Rejected.to_string(),
                    to: InvestmentStatus::Redeemed.to_string(),
                })
            }
            InvestmentStatus::Active | InvestmentStatus::Matured => {}
        }

        let maturity_at =
            investment
                .maturity_at
                .ok_or_else(|| LedgerError::InvariantViolation {
                    invariant: "accepted investment has maturity_at".to_string(),
                    details: format!("investment {}", investment_id),
                })?;
        if now < maturity_at {
            return Err(LedgerError::InvestmentNotMatured {
                investment_id: investment_id.clone(),
                maturity_at,
            });
        }

        // Status walk is atomic in the store; a concurrent double redeem
        // loses with AlreadyRedeemed.
        let redeemed = self.store.redeem_investment(investment_id, now).await?;
        let payout = redeemed
            .expected_return
            .ok_or_else(|| LedgerError::InvariantViolation {
                invariant: "accepted investment has expected_return".to_string(),
                details: format!("investment {}", investment_id),
            })?;

        self.publish(LedgerEvent::InvestmentRedeemed {
            investment_id: investment_id.clone(),
            investor: investor.clone(),
            payout,
        })
        .await;

        self.maybe_complete_pool(&redeemed.pool_id).await;

        Ok(Redemption {
            investment_id: investment_id.clone(),
            investor: investor.clone(),
            payout,
            redeemed_at: now,
        })
    }

    /// Milestones and notifications that follow an acceptance; all outside
    /// the critical section, all failure-tolerant.
    async fn post_acceptance(
        &self,
        investor: &InvestorId,
        receipt: &InvestmentReceipt,
        reservation: &crate::ledger::Reservation,
    ) {
        if self.tier_engine.qualifies_early_supporter(receipt.ordinal) {
            self.grant(investor, Milestone::EarlySupporter).await;
        }

        if reservation.just_funded {
            self.publish(LedgerEvent::PoolFunded {
                pool_id: reservation.pool_id.clone(),
                total_raised: reservation.total_raised,
            })
            .await;
            self.grant_funded_milestones(&reservation.pool_id).await;
        }

        self.publish(LedgerEvent::InvestmentAccepted {
            receipt: receipt.clone(),
        })
        .await;
    }

    /// Grant `ProjectFunded` to every investor holding an accepted
    /// investment in the pool.
    async fn grant_funded_milestones(&self, pool_id: &PoolId) {
        match self.store.list_by_pool(pool_id).await {
            Ok(investments) => {
                let mut seen = std::collections::BTreeSet::new();
                for investment in investments {
                    if investment.status.is_accepted() && seen.insert(investment.investor.clone())
                    {
                        self.grant(&investment.investor, Milestone::ProjectFunded)
                            .await;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    pool_id = %pool_id,
                    error = %err,
                    "Could not list pool investments for funded milestones"
                );
            }
        }
    }

    /// Transition the pool to `Completed` once every accepted investment is
    /// redeemed. Best-effort; a failure here leaves the pool matured.
    async fn maybe_complete_pool(&self, pool_id: &PoolId) {
        let ledger = match self.registry.get(pool_id).await {
            Some(ledger) => ledger,
            None => return,
        };

        let all_redeemed = match self.store.list_by_pool(pool_id).await {
            Ok(investments) => investments
                .iter()
                .filter(|i| i.status.is_accepted())
                .all(|i| i.status == InvestmentStatus::Redeemed),
            Err(err) => {
                tracing::warn!(pool_id = %pool_id, error = %err, "Completion check failed");
                return;
            }
        };

        if all_redeemed {
            match ledger.complete().await {
                Ok(_) => {}
                Err(LedgerError::InvalidStateTransition { .. }) => {
                    // pool not matured yet; the sweep will catch up
                }
                Err(err) => {
                    tracing::warn!(pool_id = %pool_id, error = %err, "Completion failed");
                }
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingSink;
    use crate::store::MemoryStore;
    use crate::types::{PoolSpec, RejectionReason};

    struct Harness {
        registry: Arc<PoolRegistry>,
        store: Arc<MemoryStore>,
        allocator: InvestmentAllocator,
    }

    fn harness() -> Harness {
        let config = LedgerConfig::default();
        let registry = Arc::new(PoolRegistry::new(&config));
        let store = Arc::new(MemoryStore::new());
        let allocator = InvestmentAllocator::new(
            Arc::clone(&registry),
            store.clone() as Arc<dyn InvestmentStore>,
            Arc::new(TracingSink),
            &config,
        );
        Harness {
            registry,
            store,
            allocator,
        }
    }

    async fn active_pool(h: &Harness, goal: u64, min: u64) -> PoolId {
        let spec = PoolSpec::new("Test", goal, 850, 7_776_000, min);
        let id = h
            .registry
            .create_pool(spec, Timestamp::from_secs(100))
            .await
            .unwrap();
        h.registry
            .get(&id)
            .await
            .unwrap()
            .activate(Timestamp::from_secs(200))
            .await
            .unwrap();
        id
    }

    async fn pool_total(h: &Harness, pool_id: &PoolId) -> u64 {
        h.registry
            .get(pool_id)
            .await
            .unwrap()
            .snapshot()
            .await
            .unwrap()
            .total_raised
    }

    #[tokio::test]
    async fn test_invest_zero_amount_rejected_before_ledger() {
        let h = harness();
        let pool_id = active_pool(&h, 10_000, 100).await;

        let err = h
            .allocator
            .invest(
                &pool_id,
                &InvestorId::new("alice"),
                0,
                &IdempotencyKey::new("k1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));

        // nothing touched, not even an audit record
        assert!(h
            .store
            .get_by_idempotency_key(&pool_id, &IdempotencyKey::new("k1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_invest_unknown_pool() {
        let h = harness();
        let err = h
            .allocator
            .invest(
                &PoolId::new("pool:missing"),
                &InvestorId::new("alice"),
                100,
                &IdempotencyKey::new("k1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PoolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_idempotent_replay_counts_once() {
        let h = harness();
        let pool_id = active_pool(&h, 10_000, 100).await;
        let alice = InvestorId::new("alice");
        let key = IdempotencyKey::new("retry-1");

        let first = h.allocator.invest(&pool_id, &alice, 500, &key).await.unwrap();
        let replay = h.allocator.invest(&pool_id, &alice, 500, &key).await.unwrap();

        assert_eq!(first, replay);
        assert_eq!(pool_total(&h, &pool_id).await, 500);
    }

    #[tokio::test]
    async fn test_replayed_key_with_different_amount_collides() {
        let h = harness();
        let pool_id = active_pool(&h, 10_000, 100).await;
        let alice = InvestorId::new("alice");
        let key = IdempotencyKey::new("retry-1");

        h.allocator.invest(&pool_id, &alice, 500, &key).await.unwrap();
        let err = h
            .allocator
            .invest(&pool_id, &alice, 600, &key)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::IdempotencyKeyCollision { .. }));
        assert_eq!(pool_total(&h, &pool_id).await, 500);
    }

    #[tokio::test]
    async fn test_rejection_is_audited_but_never_counted() {
        let h = harness();
        let pool_id = active_pool(&h, 1_000, 100).await;
        let alice = InvestorId::new("alice");
        let key = IdempotencyKey::new("too-big");

        let err = h
            .allocator
            .invest(&pool_id, &alice, 2_000, &key)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::CapacityExceeded {
                requested: 2_000,
                remaining: 1_000,
            }
        );

        assert_eq!(pool_total(&h, &pool_id).await, 0);

        let record = h
            .store
            .get_by_idempotency_key(&pool_id, &key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, InvestmentStatus::Rejected);
        assert_eq!(
            record.rejection_reason,
            Some(RejectionReason::CapacityExceeded {
                requested: 2_000,
                remaining: 1_000,
            })
        );
    }

    #[tokio::test]
    async fn test_rejected_key_allows_fresh_attempt() {
        let h = harness();
        let pool_id = active_pool(&h, 1_000, 100).await;
        let alice = InvestorId::new("alice");
        let key = IdempotencyKey::new("retry-after-reject");

        h.allocator
            .invest(&pool_id, &alice, 2_000, &key)
            .await
            .unwrap_err();

        // same key, smaller amount now fits
        // (a fresh record under the same key replaces the rejected one)
        let receipt = h
            .allocator
            .invest(&pool_id, &alice, 500, &key)
            .await
            .unwrap();
        assert_eq!(receipt.amount, 500);
        assert_eq!(pool_total(&h, &pool_id).await, 500);
    }

    #[tokio::test]
    async fn test_total_raised_equals_sum_of_accepted_records() {
        let h = harness();
        let pool_id = active_pool(&h, 1_000, 10).await;

        for (i, amount) in [300u64, 400, 5, 400, 350].iter().enumerate() {
            let _ = h
                .allocator
                .invest(
                    &pool_id,
                    &InvestorId::new(format!("investor-{i}")),
                    *amount,
                    &IdempotencyKey::new(format!("k{i}")),
                )
                .await;
        }

        let records = h.store.list_by_pool(&pool_id).await.unwrap();
        let accepted_sum: u64 = records
            .iter()
            .filter(|r| r.status.is_accepted())
            .map(|r| r.amount)
            .sum();

        let total = pool_total(&h, &pool_id).await;
        assert_eq!(total, accepted_sum);
        assert_eq!(total, 700); // 300 + 400 fit; 5 below min; 400, 350 over capacity
    }

    #[tokio::test]
    async fn test_concurrent_invests_fill_exactly_to_capacity() {
        let h = harness();
        let pool_id = active_pool(&h, 1_000, 10).await;
        let Harness {
            registry,
            store,
            allocator,
        } = h;
        let allocator = Arc::new(allocator);

        let mut handles = Vec::new();
        for i in 0..30 {
            let allocator = Arc::clone(&allocator);
            let pool_id = pool_id.clone();
            handles.push(tokio::spawn(async move {
                allocator
                    .invest(
                        &pool_id,
                        &InvestorId::new(format!("investor-{i}")),
                        100,
                        &IdempotencyKey::new(format!("k{i}")),
                    )
                    .await
            }));
        }

        let mut accepted = 0u64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(
                    LedgerError::CapacityExceeded { .. } | LedgerError::PoolNotActive { .. },
                ) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 10);

        let snapshot = registry
            .get(&pool_id)
            .await
            .unwrap()
            .snapshot()
            .await
            .unwrap();
        assert_eq!(snapshot.total_raised, 1_000);

        // final state: funded, and every accepted record has a distinct ordinal
        let records = store.list_by_pool(&pool_id).await.unwrap();
        let mut ordinals: Vec<u64> = records
            .iter()
            .filter(|r| r.status.is_accepted())
            .map(|r| r.ordinal.unwrap())
            .collect();
        ordinals.sort_unstable();
        assert_eq!(ordinals, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_early_supporter_granted_to_first_k_only() {
        let h = harness();
        let pool_id = active_pool(&h, 100_000, 10).await;

        for i in 0..12 {
            h.allocator
                .invest(
                    &pool_id,
                    &InvestorId::new(format!("investor-{i}")),
                    100,
                    &IdempotencyKey::new(format!("k{i}")),
                )
                .await
                .unwrap();
        }

        // default limit is 10
        for i in 0..10 {
            let milestones = h
                .store
                .milestones(&InvestorId::new(format!("investor-{i}")))
                .await
                .unwrap();
            assert!(milestones.contains(&Milestone::EarlySupporter), "i={i}");
        }
        for i in 10..12 {
            let milestones = h
                .store
                .milestones(&InvestorId::new(format!("investor-{i}")))
                .await
                .unwrap();
            assert!(!milestones.contains(&Milestone::EarlySupporter), "i={i}");
        }
    }

    #[tokio::test]
    async fn test_funded_pool_grants_project_funded_milestone() {
        let h = harness();
        let pool_id = active_pool(&h, 1_000, 100).await;
        let alice = InvestorId::new("alice");
        let bob = InvestorId::new("bob");

        h.allocator
            .invest(&pool_id, &alice, 400, &IdempotencyKey::new("k1"))
            .await
            .unwrap();
        h.allocator
            .invest(&pool_id, &bob, 600, &IdempotencyKey::new("k2"))
            .await
            .unwrap();

        for investor in [&alice, &bob] {
            let milestones = h.store.milestones(investor).await.unwrap();
            assert!(milestones.contains(&Milestone::ProjectFunded));
        }
    }

    #[tokio::test]
    async fn test_receipt_freezes_expected_return() {
        let h = harness();
        let pool_id = active_pool(&h, 10_000, 100).await;

        let receipt = h
            .allocator
            .invest(
                &pool_id,
                &InvestorId::new("alice"),
                1_000,
                &IdempotencyKey::new("k1"),
            )
            .await
            .unwrap();

        // 8.5% APY over a 90-day term: 21 interest on 1000 principal
        assert_eq!(receipt.expected_return, 1_021);
        assert_eq!(
            receipt.maturity_at,
            receipt.accepted_at.saturating_add_secs(7_776_000)
        );
    }

    #[tokio::test]
    async fn test_redeem_lifecycle() {
        let h = harness();
        let pool_id = active_pool(&h, 10_000, 100).await;
        let alice = InvestorId::new("alice");

        let receipt = h
            .allocator
            .invest(&pool_id, &alice, 1_000, &IdempotencyKey::new("k1"))
            .await
            .unwrap();

        // too early
        let early = h
            .allocator
            .redeem(&receipt.investment_id, &alice, receipt.accepted_at)
            .await
            .unwrap_err();
        assert!(matches!(early, LedgerError::InvestmentNotMatured { .. }));

        // wrong owner
        let thief = h
            .allocator
            .redeem(
                &receipt.investment_id,
                &InvestorId::new("mallory"),
                receipt.maturity_at,
            )
            .await
            .unwrap_err();
        assert!(matches!(thief, LedgerError::NotInvestmentOwner { .. }));

        // at maturity: pays the frozen quote
        let redemption = h
            .allocator
            .redeem(&receipt.investment_id, &alice, receipt.maturity_at)
            .await
            .unwrap();
        assert_eq!(redemption.payout, 1_021);

        // only once
        let twice = h
            .allocator
            .redeem(&receipt.investment_id, &alice, receipt.maturity_at)
            .await
            .unwrap_err();
        assert!(matches!(twice, LedgerError::AlreadyRedeemed { .. }));
    }
}
