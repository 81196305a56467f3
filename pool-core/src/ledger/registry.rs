//! Pool registry
//!
//! Process-wide directory of pool ledgers keyed by pool id. The registry
//! owns the id-to-ledger mapping; ledgers are never removed while any
//! investment references them (in practice: never). Lookup takes a cheap
//! read lock on the map; per-pool mutation goes through the ledger's own
//! mutex so pools never block each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::pool::PoolLedger;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::types::{Pool, PoolId, PoolSnapshot, PoolSpec, PoolStatus, Timestamp};

/// Aggregate counters across all registered pools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_pools: u64,
    pub active_pools: u64,
    pub funded_pools: u64,
    pub matured_pools: u64,
    /// Sum of `total_raised` across all pools
    pub total_raised: u64,
}

/// Pool registry
pub struct PoolRegistry {
    pools: RwLock<HashMap<PoolId, Arc<PoolLedger>>>,
    lock_timeout: Duration,
}

impl PoolRegistry {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            lock_timeout: config.lock_timeout(),
        }
    }

    /// Validate a spec and register a new pool in `Draft`.
    pub async fn create_pool(&self, spec: PoolSpec, now: Timestamp) -> LedgerResult<PoolId> {
        spec.validate()?;

        let id = PoolId::generate();
        let pool = Pool::new(id.clone(), spec, now);
        let ledger = Arc::new(PoolLedger::new(pool, self.lock_timeout));

        self.pools.write().await.insert(id.clone(), ledger);
        tracing::info!(pool_id = %id, "Pool registered");

        Ok(id)
    }

    /// Look up a ledger.
    pub async fn get(&self, pool_id: &PoolId) -> Option<Arc<PoolLedger>> {
        self.pools.read().await.get(pool_id).cloned()
    }

    /// Look up a ledger, failing with `PoolNotFound`.
    pub async fn require(&self, pool_id: &PoolId) -> LedgerResult<Arc<PoolLedger>> {
        self.get(pool_id)
            .await
            .ok_or_else(|| LedgerError::PoolNotFound {
                pool_id: pool_id.clone(),
            })
    }

    /// All registered ledgers.
    pub async fn list_all(&self) -> Vec<Arc<PoolLedger>> {
        self.pools.read().await.values().cloned().collect()
    }

    /// Snapshots of every pool, optionally filtered by status.
    pub async fn list_by_status(
        &self,
        status: Option<PoolStatus>,
    ) -> LedgerResult<Vec<PoolSnapshot>> {
        let ledgers = self.list_all().await;

        let mut snapshots = Vec::with_capacity(ledgers.len());
        for ledger in ledgers {
            let snapshot = ledger.snapshot().await?;
            if status.is_none() || status == Some(snapshot.status) {
                snapshots.push(snapshot);
            }
        }

        // stable order for callers
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(snapshots)
    }

    /// Aggregate counters across all pools.
    pub async fn stats(&self) -> LedgerResult<RegistryStats> {
        let mut stats = RegistryStats::default();

        for ledger in self.list_all().await {
            let snapshot = ledger.snapshot().await?;
            stats.total_pools += 1;
            stats.total_raised = stats.total_raised.saturating_add(snapshot.total_raised);
            match snapshot.status {
                PoolStatus::Active => stats.active_pools += 1,
                PoolStatus::Funded => stats.funded_pools += 1,
                PoolStatus::Matured => stats.matured_pools += 1,
                _ => {}
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PoolRegistry {
        PoolRegistry::new(&LedgerConfig::default())
    }

    fn spec(goal: u64) -> PoolSpec {
        PoolSpec::new("Test", goal, 500, 86_400, 10)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();
        let id = registry
            .create_pool(spec(1_000), Timestamp::from_secs(1))
            .await
            .unwrap();

        let ledger = registry.get(&id).await.unwrap();
        assert_eq!(ledger.id(), &id);
        assert!(registry.get(&PoolId::new("pool:missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_require_missing_pool() {
        let registry = registry();
        assert!(matches!(
            registry.require(&PoolId::new("pool:missing")).await,
            Err(LedgerError::PoolNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_spec() {
        let registry = registry();
        let mut bad = spec(1_000);
        bad.interest_rate_bps = 20_000;
        assert!(matches!(
            registry.create_pool(bad, Timestamp::from_secs(1)).await,
            Err(LedgerError::InvalidSpec { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let registry = registry();
        let a = registry
            .create_pool(spec(1_000), Timestamp::from_secs(1))
            .await
            .unwrap();
        let _b = registry
            .create_pool(spec(2_000), Timestamp::from_secs(2))
            .await
            .unwrap();

        registry
            .get(&a)
            .await
            .unwrap()
            .activate(Timestamp::from_secs(3))
            .await
            .unwrap();

        let drafts = registry
            .list_by_status(Some(PoolStatus::Draft))
            .await
            .unwrap();
        let actives = registry
            .list_by_status(Some(PoolStatus::Active))
            .await
            .unwrap();
        let all = registry.list_by_status(None).await.unwrap();

        assert_eq!(drafts.len(), 1);
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].id, a);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = registry();
        let a = registry
            .create_pool(spec(1_000), Timestamp::from_secs(1))
            .await
            .unwrap();
        registry
            .create_pool(spec(2_000), Timestamp::from_secs(2))
            .await
            .unwrap();

        let ledger = registry.get(&a).await.unwrap();
        ledger.activate(Timestamp::from_secs(3)).await.unwrap();
        ledger.reserve_capacity(400).await.unwrap();

        let stats = registry.stats().await.unwrap();
        assert_eq!(stats.total_pools, 2);
        assert_eq!(stats.active_pools, 1);
        assert_eq!(stats.total_raised, 400);
    }
}
