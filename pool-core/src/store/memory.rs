//! In-memory store
//!
//! Thread-safe map-backed implementation, used for tests and development.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{InvestmentStore, StoreStats};
use crate::error::{LedgerError, LedgerResult};
use crate::types::{
    IdempotencyKey, Investment, InvestmentId, InvestmentStatus, InvestorId, Milestone, PoolId,
    Timestamp,
};

/// In-memory investment store
#[derive(Debug, Default)]
pub struct MemoryStore {
    investments: Arc<RwLock<HashMap<InvestmentId, Investment>>>,
    // indexes
    dedup_index: Arc<RwLock<HashMap<(PoolId, IdempotencyKey), InvestmentId>>>,
    investor_index: Arc<RwLock<HashMap<InvestorId, Vec<InvestmentId>>>>,
    pool_index: Arc<RwLock<HashMap<PoolId, Vec<InvestmentId>>>>,
    milestones: Arc<RwLock<HashMap<InvestorId, BTreeSet<Milestone>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all data.
    pub async fn clear(&self) {
        self.investments.write().await.clear();
        self.dedup_index.write().await.clear();
        self.investor_index.write().await.clear();
        self.pool_index.write().await.clear();
        self.milestones.write().await.clear();
    }
}

#[async_trait]
impl InvestmentStore for MemoryStore {
    async fn save_investment(&self, investment: &Investment) -> LedgerResult<()> {
        let is_new = {
            let mut investments = self.investments.write().await;
            investments
                .insert(investment.id.clone(), investment.clone())
                .is_none()
        };

        if is_new {
            self.dedup_index.write().await.insert(
                (investment.pool_id.clone(), investment.idempotency_key.clone()),
                investment.id.clone(),
            );
            self.investor_index
                .write()
                .await
                .entry(investment.investor.clone())
                .or_default()
                .push(investment.id.clone());
            self.pool_index
                .write()
                .await
                .entry(investment.pool_id.clone())
                .or_default()
                .push(investment.id.clone());
        }

        Ok(())
    }

    async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Option<Investment>> {
        Ok(self.investments.read().await.get(id).cloned())
    }

    async fn get_by_idempotency_key(
        &self,
        pool_id: &PoolId,
        key: &IdempotencyKey,
    ) -> LedgerResult<Option<Investment>> {
        let id = {
            let index = self.dedup_index.read().await;
            index.get(&(pool_id.clone(), key.clone())).cloned()
        };
        match id {
            Some(id) => self.get_investment(&id).await,
            None => Ok(None),
        }
    }

    async fn list_by_investor(&self, investor: &InvestorId) -> LedgerResult<Vec<Investment>> {
        let ids = self
            .investor_index
            .read()
            .await
            .get(investor)
            .cloned()
            .unwrap_or_default();

        let investments = self.investments.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| investments.get(id).cloned())
            .collect())
    }

    async fn list_by_pool(&self, pool_id: &PoolId) -> LedgerResult<Vec<Investment>> {
        let ids = self
            .pool_index
            .read()
            .await
            .get(pool_id)
            .cloned()
            .unwrap_or_default();

        let investments = self.investments.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| investments.get(id).cloned())
            .collect())
    }

    async fn redeem_investment(
        &self,
        id: &InvestmentId,
        now: Timestamp,
    ) -> LedgerResult<Investment> {
        let mut investments = self.investments.write().await;
        let investment =
            investments
                .get_mut(id)
                .ok_or_else(|| LedgerError::InvestmentNotFound {
                    investment_id: id.clone(),
                })?;

        match investment.status {
            InvestmentStatus::Redeemed => Err(LedgerError::AlreadyRedeemed {
                investment_id: id.clone(),
            }),
            InvestmentStatus::Rejected => Err(LedgerError::InvalidStateTransition {
                from: investment.status.to_string(),
                to: InvestmentStatus::Redeemed.to_string(),
            }),
            InvestmentStatus::Active | InvestmentStatus::Matured => {
                investment.status = InvestmentStatus::Redeemed;
                investment.redeemed_at = Some(now);
                Ok(investment.clone())
            }
        }
    }

    async fn mature_pool_investments(&self, pool_id: &PoolId) -> LedgerResult<u64> {
        let ids = self
            .pool_index
            .read()
            .await
            .get(pool_id)
            .cloned()
            .unwrap_or_default();

        let mut investments = self.investments.write().await;
        let mut matured = 0u64;
        for id in &ids {
            if let Some(investment) = investments.get_mut(id) {
                if investment.status == InvestmentStatus::Active {
                    investment.status = InvestmentStatus::Matured;
                    matured += 1;
                }
            }
        }
        Ok(matured)
    }

    async fn cumulative_invested(&self, investor: &InvestorId) -> LedgerResult<u64> {
        let records = self.list_by_investor(investor).await?;
        Ok(records
            .iter()
            .filter(|i| i.status.is_accepted())
            .map(|i| i.amount)
            .sum())
    }

    async fn distinct_investors(&self) -> LedgerResult<u64> {
        let investments = self.investments.read().await;
        let investors: BTreeSet<&InvestorId> = investments
            .values()
            .filter(|i| i.status.is_accepted())
            .map(|i| &i.investor)
            .collect();
        Ok(investors.len() as u64)
    }

    async fn grant_milestone(
        &self,
        investor: &InvestorId,
        milestone: Milestone,
    ) -> LedgerResult<bool> {
        let mut milestones = self.milestones.write().await;
        Ok(milestones
            .entry(investor.clone())
            .or_default()
            .insert(milestone))
    }

    async fn milestones(&self, investor: &InvestorId) -> LedgerResult<BTreeSet<Milestone>> {
        Ok(self
            .milestones
            .read()
            .await
            .get(investor)
            .cloned()
            .unwrap_or_default())
    }

    async fn stats(&self) -> LedgerResult<StoreStats> {
        let investments = self.investments.read().await;
        let mut stats = StoreStats {
            total_investments: investments.len() as u64,
            ..Default::default()
        };
        for investment in investments.values() {
            match investment.status {
                InvestmentStatus::Rejected => stats.rejected_investments += 1,
                InvestmentStatus::Redeemed => {
                    stats.accepted_investments += 1;
                    stats.redeemed_investments += 1;
                }
                _ => stats.accepted_investments += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RejectionReason;

    fn accepted(id: &str, pool: &str, investor: &str, amount: u64) -> Investment {
        Investment::accepted(
            InvestmentId::new(id),
            PoolId::new(pool),
            InvestorId::new(investor),
            amount,
            IdempotencyKey::new(format!("key-{id}")),
            Timestamp::from_secs(1_000),
            amount + amount / 10,
            Timestamp::from_secs(2_000),
            1,
        )
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemoryStore::new();
        let inv = accepted("inv:1", "pool:1", "alice", 500);

        store.save_investment(&inv).await.unwrap();
        let loaded = store.get_investment(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.amount, 500);
    }

    #[tokio::test]
    async fn test_dedup_index() {
        let store = MemoryStore::new();
        let inv = accepted("inv:1", "pool:1", "alice", 500);
        store.save_investment(&inv).await.unwrap();

        let found = store
            .get_by_idempotency_key(&inv.pool_id, &inv.idempotency_key)
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, inv.id);

        let missing = store
            .get_by_idempotency_key(&PoolId::new("pool:2"), &inv.idempotency_key)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_cumulative_excludes_rejected() {
        let store = MemoryStore::new();
        store
            .save_investment(&accepted("inv:1", "pool:1", "alice", 500))
            .await
            .unwrap();
        store
            .save_investment(&accepted("inv:2", "pool:2", "alice", 700))
            .await
            .unwrap();

        let rejected = Investment::rejected(
            InvestmentId::new("inv:3"),
            PoolId::new("pool:1"),
            InvestorId::new("alice"),
            10_000,
            IdempotencyKey::new("key-3"),
            RejectionReason::CapacityExceeded {
                requested: 10_000,
                remaining: 100,
            },
            Timestamp::from_secs(1_500),
        );
        store.save_investment(&rejected).await.unwrap();

        assert_eq!(
            store
                .cumulative_invested(&InvestorId::new("alice"))
                .await
                .unwrap(),
            1_200
        );
    }

    #[tokio::test]
    async fn test_redeem_is_atomic_and_single_shot() {
        let store = MemoryStore::new();
        let inv = accepted("inv:1", "pool:1", "alice", 500);
        store.save_investment(&inv).await.unwrap();

        let redeemed = store
            .redeem_investment(&inv.id, Timestamp::from_secs(3_000))
            .await
            .unwrap();
        assert_eq!(redeemed.status, InvestmentStatus::Redeemed);

        assert!(matches!(
            store
                .redeem_investment(&inv.id, Timestamp::from_secs(3_001))
                .await,
            Err(LedgerError::AlreadyRedeemed { .. })
        ));
    }

    #[tokio::test]
    async fn test_mature_pool_investments() {
        let store = MemoryStore::new();
        store
            .save_investment(&accepted("inv:1", "pool:1", "alice", 500))
            .await
            .unwrap();
        store
            .save_investment(&accepted("inv:2", "pool:1", "bob", 300))
            .await
            .unwrap();
        store
            .save_investment(&accepted("inv:3", "pool:2", "carol", 400))
            .await
            .unwrap();

        let matured = store
            .mature_pool_investments(&PoolId::new("pool:1"))
            .await
            .unwrap();
        assert_eq!(matured, 2);

        let untouched = store
            .get_investment(&InvestmentId::new("inv:3"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, InvestmentStatus::Active);
    }

    #[tokio::test]
    async fn test_milestones_append_only() {
        let store = MemoryStore::new();
        let alice = InvestorId::new("alice");

        assert!(store
            .grant_milestone(&alice, Milestone::EarlySupporter)
            .await
            .unwrap());
        // second grant is a no-op
        assert!(!store
            .grant_milestone(&alice, Milestone::EarlySupporter)
            .await
            .unwrap());

        let milestones = store.milestones(&alice).await.unwrap();
        assert!(milestones.contains(&Milestone::EarlySupporter));
        assert_eq!(milestones.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryStore::new();
        store
            .save_investment(&accepted("inv:1", "pool:1", "alice", 500))
            .await
            .unwrap();
        let rejected = Investment::rejected(
            InvestmentId::new("inv:2"),
            PoolId::new("pool:1"),
            InvestorId::new("bob"),
            1,
            IdempotencyKey::new("key-2"),
            RejectionReason::BelowMinimum {
                amount: 1,
                minimum: 10,
            },
            Timestamp::from_secs(1_500),
        );
        store.save_investment(&rejected).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_investments, 2);
        assert_eq!(stats.accepted_investments, 1);
        assert_eq!(stats.rejected_investments, 1);
    }
}
