//! Achievement tier engine
//!
//! Pure derivation of tiers from cumulative accepted investment, plus the
//! ordinal rule for the EarlySupporter milestone. Thresholds are in the
//! pool currency's smallest unit; the boundary treatment is pinned by tests
//! because it is the classic off-by-one trap:
//!
//! | cumulative      | tier   |
//! |-----------------|--------|
//! | 0               | none   |
//! | 1..=999         | bronze |
//! | 1000..=10000    | silver |
//! | 10001..         | gold   |

use crate::config::LedgerConfig;
use crate::constants::{GOLD_THRESHOLD, SILVER_THRESHOLD};
use crate::types::{AchievementRecord, InvestorId, Milestone, Tier};
use std::collections::BTreeSet;

/// Achievement tier engine
#[derive(Debug, Clone)]
pub struct AchievementTierEngine {
    /// Acceptance ordinals `1..=limit` qualify for EarlySupporter
    early_supporter_limit: u64,
}

impl AchievementTierEngine {
    pub fn new(early_supporter_limit: u64) -> Self {
        Self {
            early_supporter_limit,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.early_supporter_limit)
    }

    /// Map cumulative accepted investment to a tier. Pure and monotone.
    pub fn derive_tier(cumulative_invested: u64) -> Tier {
        if cumulative_invested == 0 {
            Tier::None
        } else if cumulative_invested < SILVER_THRESHOLD {
            Tier::Bronze
        } else if cumulative_invested <= GOLD_THRESHOLD {
            Tier::Silver
        } else {
            Tier::Gold
        }
    }

    /// Whether an acceptance ordinal (1-based, fixed at acceptance time)
    /// earns the EarlySupporter milestone. Never recomputed retroactively:
    /// "first K" is defined by acceptance order, not current standing.
    pub fn qualifies_early_supporter(&self, ordinal: u64) -> bool {
        ordinal >= 1 && ordinal <= self.early_supporter_limit
    }

    /// Assemble the derived record for one investor.
    pub fn record(
        &self,
        investor: InvestorId,
        cumulative_invested: u64,
        milestones: BTreeSet<Milestone>,
    ) -> AchievementRecord {
        AchievementRecord {
            investor,
            tier: Self::derive_tier(cumulative_invested),
            cumulative_invested,
            milestones,
        }
    }
}

impl Default for AchievementTierEngine {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EARLY_SUPPORTER_LIMIT)
    }
}
