//! Sled-backed persistent store
//!
//! One tree per record family, rows encoded with serde_json. The record
//! layout matches the persisted-state contract: one append-only row per
//! investment (rejected ones included, for audit), deduplicated by
//! `(pool_id, idempotency_key)`.
//!
//! Read-modify-write operations serialize on an internal gate so that the
//! status walk and index maintenance stay atomic; plain reads go straight
//! to the trees.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tokio::sync::Mutex;

use super::{InvestmentStore, StoreStats};
use crate::error::{LedgerError, LedgerResult};
use crate::types::{
    IdempotencyKey, Investment, InvestmentId, InvestmentStatus, InvestorId, Milestone, PoolId,
    Timestamp,
};

const INVESTMENTS_TREE: &str = "investments";
const DEDUP_TREE: &str = "dedup_index";
const INVESTOR_INDEX_TREE: &str = "investor_index";
const POOL_INDEX_TREE: &str = "pool_index";
const MILESTONES_TREE: &str = "milestones";

/// Sled-backed investment store
pub struct SledStore {
    db: sled::Db,
    investments: sled::Tree,
    dedup_index: sled::Tree,
    investor_index: sled::Tree,
    pool_index: sled::Tree,
    milestones: sled::Tree,
    write_gate: Mutex<()>,
}

impl SledStore {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open sled db: {e}")))?;

        let investments = open_tree(&db, INVESTMENTS_TREE)?;
        let dedup_index = open_tree(&db, DEDUP_TREE)?;
        let investor_index = open_tree(&db, INVESTOR_INDEX_TREE)?;
        let pool_index = open_tree(&db, POOL_INDEX_TREE)?;
        let milestones = open_tree(&db, MILESTONES_TREE)?;

        Ok(Self {
            db,
            investments,
            dedup_index,
            investor_index,
            pool_index,
            milestones,
            write_gate: Mutex::new(()),
        })
    }

    /// Flush dirty buffers to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush db: {e}")))?;
        Ok(())
    }

    fn serialize<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    fn dedup_key(pool_id: &PoolId, key: &IdempotencyKey) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(pool_id.as_str().len() + key.as_str().len() + 1);
        bytes.extend_from_slice(pool_id.as_str().as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(key.as_str().as_bytes());
        bytes
    }

    fn load_investment(&self, id: &InvestmentId) -> LedgerResult<Option<Investment>> {
        let row = self
            .investments
            .get(id.as_str().as_bytes())
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        row.map(|bytes| Self::deserialize(&bytes)).transpose()
    }

    fn store_investment(&self, investment: &Investment) -> LedgerResult<()> {
        self.investments
            .insert(
                investment.id.as_str().as_bytes(),
                Self::serialize(investment)?,
            )
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(())
    }

    fn load_id_list(&self, tree: &sled::Tree, key: &str) -> LedgerResult<Vec<InvestmentId>> {
        let row = tree
            .get(key.as_bytes())
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        match row {
            Some(bytes) => Self::deserialize(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn append_id(
        &self,
        tree: &sled::Tree,
        key: &str,
        id: &InvestmentId,
    ) -> LedgerResult<()> {
        let mut ids = self.load_id_list(tree, key)?;
        if !ids.contains(id) {
            ids.push(id.clone());
            tree.insert(key.as_bytes(), Self::serialize(&ids)?)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl InvestmentStore for SledStore {
    async fn save_investment(&self, investment: &Investment) -> LedgerResult<()> {
        let _gate = self.write_gate.lock().await;

        let is_new = self.load_investment(&investment.id)?.is_none();
        self.store_investment(investment)?;

        if is_new {
            self.dedup_index
                .insert(
                    Self::dedup_key(&investment.pool_id, &investment.idempotency_key),
                    investment.id.as_str().as_bytes(),
                )
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            self.append_id(
                &self.investor_index,
                investment.investor.as_str(),
                &investment.id,
            )?;
            self.append_id(&self.pool_index, investment.pool_id.as_str(), &investment.id)?;
        }

        Ok(())
    }

    async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Option<Investment>> {
        self.load_investment(id)
    }

    async fn get_by_idempotency_key(
        &self,
        pool_id: &PoolId,
        key: &IdempotencyKey,
    ) -> LedgerResult<Option<Investment>> {
        let row = self
            .dedup_index
            .get(Self::dedup_key(pool_id, key))
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        match row {
            Some(bytes) => {
                let id = InvestmentId::new(String::from_utf8_lossy(&bytes).to_string());
                self.load_investment(&id)
            }
            None => Ok(None),
        }
    }

    async fn list_by_investor(&self, investor: &InvestorId) -> LedgerResult<Vec<Investment>> {
        let ids = self.load_id_list(&self.investor_index, investor.as_str())?;
        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(investment) = self.load_investment(id)? {
                records.push(investment);
            }
        }
        Ok(records)
    }

    async fn list_by_pool(&self, pool_id: &PoolId) -> LedgerResult<Vec<Investment>> {
        let ids = self.load_id_list(&self.pool_index, pool_id.as_str())?;
        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(investment) = self.load_investment(id)? {
                records.push(investment);
            }
        }
        Ok(records)
    }

    async fn redeem_investment(
        &self,
        id: &InvestmentId,
        now: Timestamp,
    ) -> LedgerResult<Investment> {
        let _gate = self.write_gate.lock().await;

        let mut investment =
            self.load_investment(id)?
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
                self.store_investment(&investment)?;
                Ok(investment)
            }
        }
    }

    async fn mature_pool_investments(&self, pool_id: &PoolId) -> LedgerResult<u64> {
        let _gate = self.write_gate.lock().await;

        let ids = self.load_id_list(&self.pool_index, pool_id.as_str())?;
        let mut matured = 0u64;
        for id in &ids {
            if let Some(mut investment) = self.load_investment(id)? {
                if investment.status == InvestmentStatus::Active {
                    investment.status = InvestmentStatus::Matured;
                    self.store_investment(&investment)?;
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
        let mut investors = BTreeSet::new();
        for row in self.investments.iter() {
            let (_, bytes) = row.map_err(|e| LedgerError::Storage(e.to_string()))?;
            let investment: Investment = Self::deserialize(&bytes)?;
            if investment.status.is_accepted() {
                investors.insert(investment.investor);
            }
        }
        Ok(investors.len() as u64)
    }

    async fn grant_milestone(
        &self,
        investor: &InvestorId,
        milestone: Milestone,
    ) -> LedgerResult<bool> {
        let _gate = self.write_gate.lock().await;

        let row = self
            .milestones
            .get(investor.as_str().as_bytes())
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        let mut granted: BTreeSet<Milestone> = match row {
            Some(bytes) => Self::deserialize(&bytes)?,
            None => BTreeSet::new(),
        };

        let newly = granted.insert(milestone);
        if newly {
            self.milestones
                .insert(investor.as_str().as_bytes(), Self::serialize(&granted)?)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
        }
        Ok(newly)
    }

    async fn milestones(&self, investor: &InvestorId) -> LedgerResult<BTreeSet<Milestone>> {
        let row = self
            .milestones
            .get(investor.as_str().as_bytes())
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        match row {
            Some(bytes) => Self::deserialize(&bytes),
            None => Ok(BTreeSet::new()),
        }
    }

    async fn stats(&self) -> LedgerResult<StoreStats> {
        let mut stats = StoreStats::default();
        for row in self.investments.iter() {
            let (_, bytes) = row.map_err(|e| LedgerError::Storage(e.to_string()))?;
            let investment: Investment = Self::deserialize(&bytes)?;
            stats.total_investments += 1;
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

fn open_tree(db: &sled::Db, name: &str) -> LedgerResult<sled::Tree> {
    db.open_tree(name)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {name} tree: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (SledStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn accepted(id: &str, pool: &str, investor: &str, amount: u64) -> Investment {
        Investment::accepted(
            InvestmentId::new(id),
            PoolId::new(pool),
            InvestorId::new(investor),
            amount,
            IdempotencyKey::new(format!("key-{id}")),
            Timestamp::from_secs(1_000),
            amount + 10,
            Timestamp::from_secs(2_000),
            1,
        )
    }

    #[tokio::test]
    async fn test_roundtrip_and_dedup() {
        let (store, _dir) = store();
        let inv = accepted("inv:1", "pool:1", "alice", 500);

        store.save_investment(&inv).await.unwrap();

        let loaded = store.get_investment(&inv.id).await.unwrap().unwrap();
        assert_eq!(loaded.amount, 500);
        assert_eq!(loaded.status, InvestmentStatus::Active);

        let by_key = store
            .get_by_idempotency_key(&inv.pool_id, &inv.idempotency_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, inv.id);
    }

    #[tokio::test]
    async fn test_indexes_survive_updates() {
        let (store, _dir) = store();
        let inv = accepted("inv:1", "pool:1", "alice", 500);
        store.save_investment(&inv).await.unwrap();

        // update via redeem must not duplicate index entries
        store
            .redeem_investment(&inv.id, Timestamp::from_secs(5_000))
            .await
            .unwrap();

        let records = store
            .list_by_investor(&InvestorId::new("alice"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvestmentStatus::Redeemed);
    }

    #[tokio::test]
    async fn test_redeem_single_shot() {
        let (store, _dir) = store();
        let inv = accepted("inv:1", "pool:1", "alice", 500);
        store.save_investment(&inv).await.unwrap();

        store
            .redeem_investment(&inv.id, Timestamp::from_secs(5_000))
            .await
            .unwrap();
        assert!(matches!(
            store
                .redeem_investment(&inv.id, Timestamp::from_secs(5_001))
                .await,
            Err(LedgerError::AlreadyRedeemed { .. })
        ));
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store
                .save_investment(&accepted("inv:1", "pool:1", "alice", 500))
                .await
                .unwrap();
            store
                .grant_milestone(&InvestorId::new("alice"), Milestone::EarlySupporter)
                .await
                .unwrap();
            store.flush().unwrap();
        }

        let reopened = SledStore::open(dir.path()).unwrap();
        let loaded = reopened
            .get_investment(&InvestmentId::new("inv:1"))
            .await
            .unwrap();
        assert!(loaded.is_some());
        assert!(reopened
            .milestones(&InvestorId::new("alice"))
            .await
            .unwrap()
            .contains(&Milestone::EarlySupporter));
    }

    #[tokio::test]
    async fn test_cumulative_and_stats() {
        let (store, _dir) = store();
        store
            .save_investment(&accepted("inv:1", "pool:1", "alice", 500))
            .await
            .unwrap();
        store
            .save_investment(&accepted("inv:2", "pool:2", "alice", 250))
            .await
            .unwrap();

        assert_eq!(
            store
                .cumulative_invested(&InvestorId::new("alice"))
                .await
                .unwrap(),
            750
        );
        assert_eq!(store.distinct_investors().await.unwrap(), 1);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_investments, 2);
        assert_eq!(stats.accepted_investments, 2);
    }
}
