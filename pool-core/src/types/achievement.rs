//! Achievement tiers and milestones
//!
//! Tier is a pure, monotone, idempotent function of an investor's cumulative
//! accepted investment; it is derived on read and only ever cached, never
//! stored as independently mutable state. Milestones are append-only flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::common::InvestorId;

/// Achievement tier, ordered `None < Bronze < Silver < Gold`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Bronze => write!(f, "bronze"),
            Self::Silver => write!(f, "silver"),
            Self::Gold => write!(f, "gold"),
        }
    }
}

/// Milestone flags
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// Explicitly connected a session/wallet
    WelcomeConnected,
    /// Created at least one pool
    Creator,
    /// Among the first K accepted investments of some pool; granted at
    /// acceptance time, never recomputed retroactively
    EarlySupporter,
    /// Held an accepted investment in a pool that reached funded
    ProjectFunded,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WelcomeConnected => write!(f, "welcome_connected"),
            Self::Creator => write!(f, "creator"),
            Self::EarlySupporter => write!(f, "early_supporter"),
            Self::ProjectFunded => write!(f, "project_funded"),
        }
    }
}

/// Derived achievement view for one investor; recomputable, not authoritative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub investor: InvestorId,
    pub tier: Tier,
    pub cumulative_invested: u64,
    pub milestones: BTreeSet<Milestone>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::None < Tier::Bronze);
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Silver < Tier::Gold);
    }

    #[test]
    fn test_milestone_display() {
        assert_eq!(Milestone::EarlySupporter.to_string(), "early_supporter");
        assert_eq!(Milestone::WelcomeConnected.to_string(), "welcome_connected");
    }
}
