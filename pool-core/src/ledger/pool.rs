//! Pool ledger
//!
//! Single authoritative state for one pool and the sole serialization point
//! for its mutations. Each pool is an independent unit of mutual exclusion:
//! `reserve_capacity` and the lifecycle transitions on the same pool run
//! under that pool's mutex, while operations on distinct pools never block
//! each other.
//!
//! The critical section covers only the in-memory check-and-increment; no
//! storage or notification I/O ever runs while the lock is held.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

use crate::error::{LedgerError, LedgerResult};
use crate::money;
use crate::types::{Pool, PoolId, PoolSnapshot, PoolStatus, Timestamp};

/// Post-reservation view handed back to the allocator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub pool_id: PoolId,
    pub amount: u64,
    /// 1-based acceptance order within this pool
    pub ordinal: u64,
    pub total_raised: u64,
    pub remaining: u64,
    /// Whether this reservation filled the pool
    pub just_funded: bool,
}

/// Pool ledger: owns one pool's state machine and capacity invariant
pub struct PoolLedger {
    id: PoolId,
    pool: Mutex<Pool>,
    lock_timeout: Duration,
}

impl PoolLedger {
    pub fn new(pool: Pool, lock_timeout: Duration) -> Self {
        Self {
            id: pool.id.clone(),
            pool: Mutex::new(pool),
            lock_timeout,
        }
    }

    pub fn id(&self) -> &PoolId {
        &self.id
    }

    /// Acquire the per-pool critical section with a bounded wait.
    async fn lock(&self) -> LedgerResult<MutexGuard<'_, Pool>> {
        timeout(self.lock_timeout, self.pool.lock())
            .await
            .map_err(|_| LedgerError::LockTimeout {
                pool_id: self.id.clone(),
                waited_ms: self.lock_timeout.as_millis() as u64,
            })
    }

    /// `Draft -> Active`; records the activation instant maturity is
    /// measured from.
    pub async fn activate(&self, now: Timestamp) -> LedgerResult<PoolSnapshot> {
        let mut pool = self.lock().await?;

        if !pool.status.can_transition_to(PoolStatus::Active) {
            return Err(LedgerError::InvalidStateTransition {
                from: pool.status.to_string(),
                to: PoolStatus::Active.to_string(),
            });
        }

        pool.status = PoolStatus::Active;
        pool.activated_at = Some(now);

        tracing::info!(pool_id = %pool.id, "Pool activated");
        Ok(PoolSnapshot::from(&*pool))
    }

    /// Atomic capacity check-and-increment.
    ///
    /// Requires `status == Active`, `amount >= min_investment`, and
    /// `total_raised + amount <= funding_goal`. An over-capacity request is
    /// rejected in full with the exact remaining capacity; there is no
    /// partial-fill or clamping policy. When the reservation fills the pool
    /// the `Funded` transition happens in this same critical section, so no
    /// caller can observe a full pool that still reads `active`.
    pub async fn reserve_capacity(&self, amount: u64) -> LedgerResult<Reservation> {
        let mut pool = self.lock().await?;

        if pool.status != PoolStatus::Active {
            return Err(LedgerError::PoolNotActive {
                pool_id: pool.id.clone(),
                status: pool.status,
            });
        }
        if amount < pool.min_investment {
            return Err(LedgerError::BelowMinimum {
                amount,
                minimum: pool.min_investment,
            });
        }
        let remaining = pool.remaining_capacity();
        if amount > remaining {
            return Err(LedgerError::CapacityExceeded {
                requested: amount,
                remaining,
            });
        }

        pool.total_raised = money::add(pool.total_raised, amount)?;

        if pool.total_raised > pool.funding_goal {
            // must be unreachable given the check above
            tracing::error!(
                pool_id = %pool.id,
                total_raised = pool.total_raised,
                funding_goal = pool.funding_goal,
                "Capacity invariant violated"
            );
            return Err(LedgerError::InvariantViolation {
                invariant: "total_raised <= funding_goal".to_string(),
                details: format!(
                    "pool {}: total_raised {} exceeds funding_goal {}",
                    pool.id, pool.total_raised, pool.funding_goal
                ),
            });
        }

        pool.accepted_count += 1;
        let ordinal = pool.accepted_count;

        let just_funded = pool.total_raised == pool.funding_goal;
        if just_funded {
            pool.status = PoolStatus::Funded;
            tracing::info!(pool_id = %pool.id, total_raised = pool.total_raised, "Pool funded");
        }

        tracing::debug!(
            pool_id = %pool.id,
            amount,
            ordinal,
            total_raised = pool.total_raised,
            "Capacity reserved"
        );

        Ok(Reservation {
            pool_id: pool.id.clone(),
            amount,
            ordinal,
            total_raised: pool.total_raised,
            remaining: pool.remaining_capacity(),
            just_funded,
        })
    }

    /// `Active|Funded -> Matured` once the loan term has elapsed past
    /// activation. Idempotent and side-effect-free when already matured.
    /// Returns `true` when this call performed the transition.
    pub async fn check_maturity(&self, now: Timestamp) -> LedgerResult<bool> {
        let mut pool = self.lock().await?;

        if !matches!(pool.status, PoolStatus::Active | PoolStatus::Funded) {
            return Ok(false);
        }

        let matures_at = match pool.matures_at() {
            Some(at) => at,
            None => return Ok(false), // never activated
        };

        if now < matures_at {
            return Ok(false);
        }

        pool.status = PoolStatus::Matured;
        tracing::info!(pool_id = %pool.id, "Pool matured");
        Ok(true)
    }

    /// `Draft -> Cancelled`, or `Active -> Cancelled` while nothing is
    /// committed. Once any funds are committed there is no defined refund
    /// path, so cancellation is refused.
    pub async fn cancel(&self) -> LedgerResult<PoolSnapshot> {
        let mut pool = self.lock().await?;

        let allowed =
            pool.status.can_transition_to(PoolStatus::Cancelled) && pool.total_raised == 0;
        if !allowed {
            return Err(LedgerError::InvalidStateTransition {
                from: pool.status.to_string(),
                to: PoolStatus::Cancelled.to_string(),
            });
        }

        pool.status = PoolStatus::Cancelled;
        tracing::info!(pool_id = %pool.id, "Pool cancelled");
        Ok(PoolSnapshot::from(&*pool))
    }

    /// `Matured -> Completed`; called once every accepted investment has
    /// been redeemed.
    pub async fn complete(&self) -> LedgerResult<PoolSnapshot> {
        let mut pool = self.lock().await?;

        if !pool.status.can_transition_to(PoolStatus::Completed) {
            return Err(LedgerError::InvalidStateTransition {
                from: pool.status.to_string(),
                to: PoolStatus::Completed.to_string(),
            });
        }

        pool.status = PoolStatus::Completed;
        tracing::info!(pool_id = %pool.id, "Pool completed");
        Ok(PoolSnapshot::from(&*pool))
    }

    /// Consistent read-only copy.
    pub async fn snapshot(&self) -> LedgerResult<PoolSnapshot> {
        let pool = self.lock().await?;
        Ok(PoolSnapshot::from(&*pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PoolSpec;

    fn ledger(goal: u64, min: u64) -> PoolLedger {
        let spec = PoolSpec::new("Test", goal, 850, 7_776_000, min);
        let pool = Pool::new(PoolId::new("pool:1"), spec, Timestamp::from_secs(100));
        PoolLedger::new(pool, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_activate_from_draft() {
        let ledger = ledger(10_000, 100);
        let snapshot = ledger.activate(Timestamp::from_secs(200)).await.unwrap();
        assert_eq!(snapshot.status, PoolStatus::Active);
        assert_eq!(snapshot.activated_at, Some(Timestamp::from_secs(200)));
    }

    #[tokio::test]
    async fn test_activate_twice_fails() {
        let ledger = ledger(10_000, 100);
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();
        assert!(matches!(
            ledger.activate(Timestamp::from_secs(201)).await,
            Err(LedgerError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_reserve_on_draft_pool_rejected() {
        let ledger = ledger(10_000, 100);
        assert!(matches!(
            ledger.reserve_capacity(500).await,
            Err(LedgerError::PoolNotActive { .. })
        ));
    }

    #[tokio::test]
    async fn test_reserve_below_minimum_rejected() {
        let ledger = ledger(10_000, 100);
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();
        assert!(matches!(
            ledger.reserve_capacity(99).await,
            Err(LedgerError::BelowMinimum {
                amount: 99,
                minimum: 100,
            })
        ));
    }

    #[tokio::test]
    async fn test_reserve_reports_exact_remaining() {
        let ledger = ledger(10_000, 100);
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();
        ledger.reserve_capacity(9_400).await.unwrap();

        let err = ledger.reserve_capacity(700).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::CapacityExceeded {
                requested: 700,
                remaining: 600,
            }
        );

        // no partial fill happened
        let snapshot = ledger.snapshot().await.unwrap();
        assert_eq!(snapshot.total_raised, 9_400);
    }

    #[tokio::test]
    async fn test_exact_fill_transitions_to_funded_atomically() {
        let ledger = ledger(1_000, 100);
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();

        let reservation = ledger.reserve_capacity(1_000).await.unwrap();
        assert!(reservation.just_funded);
        assert_eq!(reservation.remaining, 0);

        let snapshot = ledger.snapshot().await.unwrap();
        assert_eq!(snapshot.status, PoolStatus::Funded);
        assert_eq!(snapshot.total_raised, 1_000);
    }

    #[tokio::test]
    async fn test_ordinals_follow_acceptance_order() {
        let ledger = ledger(10_000, 100);
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();

        let first = ledger.reserve_capacity(100).await.unwrap();
        let second = ledger.reserve_capacity(100).await.unwrap();
        let third = ledger.reserve_capacity(100).await.unwrap();

        assert_eq!(first.ordinal, 1);
        assert_eq!(second.ordinal, 2);
        assert_eq!(third.ordinal, 3);
    }

    #[tokio::test]
    async fn test_check_maturity_idempotent() {
        let ledger = ledger(10_000, 100);
        ledger.activate(Timestamp::from_secs(1_000)).await.unwrap();

        // term not yet elapsed
        assert!(!ledger
            .check_maturity(Timestamp::from_secs(1_001))
            .await
            .unwrap());

        let past_term = Timestamp::from_secs(1_000 + 7_776_000);
        assert!(ledger.check_maturity(past_term).await.unwrap());
        assert_eq!(
            ledger.snapshot().await.unwrap().status,
            PoolStatus::Matured
        );

        // second call is a no-op
        assert!(!ledger.check_maturity(past_term).await.unwrap());
        assert_eq!(
            ledger.snapshot().await.unwrap().status,
            PoolStatus::Matured
        );
    }

    #[tokio::test]
    async fn test_funded_pool_matures() {
        let ledger = ledger(1_000, 100);
        ledger.activate(Timestamp::from_secs(1_000)).await.unwrap();
        ledger.reserve_capacity(1_000).await.unwrap();

        assert!(ledger
            .check_maturity(Timestamp::from_secs(1_000 + 7_776_000))
            .await
            .unwrap());
        assert_eq!(
            ledger.snapshot().await.unwrap().status,
            PoolStatus::Matured
        );
    }

    #[tokio::test]
    async fn test_cancel_refused_once_funds_committed() {
        let ledger = ledger(10_000, 100);
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();
        ledger.reserve_capacity(500).await.unwrap();

        assert!(matches!(
            ledger.cancel().await,
            Err(LedgerError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_from_draft_and_empty_active() {
        let draft = ledger(10_000, 100);
        assert_eq!(
            draft.cancel().await.unwrap().status,
            PoolStatus::Cancelled
        );

        let active = ledger(10_000, 100);
        active.activate(Timestamp::from_secs(200)).await.unwrap();
        assert_eq!(
            active.cancel().await.unwrap().status,
            PoolStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        use std::sync::Arc;

        let ledger = Arc::new(ledger(1_000, 10));
        ledger.activate(Timestamp::from_secs(200)).await.unwrap();

        // 40 concurrent requests of 50 each = 2_000 requested for 1_000 capacity
        let mut handles = Vec::new();
        for _ in 0..40 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(
                async move { ledger.reserve_capacity(50).await },
            ));
        }

        let mut accepted = 0u64;
        let mut rejected = 0u64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(LedgerError::CapacityExceeded { .. })
                | Err(LedgerError::PoolNotActive { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 20);
        assert_eq!(rejected, 20);

        let snapshot = ledger.snapshot().await.unwrap();
        assert_eq!(snapshot.total_raised, 1_000);
        assert_eq!(snapshot.status, PoolStatus::Funded);
    }
}
