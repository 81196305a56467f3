//! Pool record and lifecycle
//!
//! # State machine
//!
//! ```text
//! draft ──→ active ──┬──→ funded ──→ matured ──→ completed
//!   │         │      │                 ▲
//!   │         │      └─────────────────┘
//!   │         └──→ cancelled   (only while nothing is committed)
//!   └──→ cancelled
//! ```
//!
//! A pool flips to `funded` in the same critical section as the accepting
//! reservation; there is no observable window where `total_raised` equals
//! the goal while the status still reads `active`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{InvestorId, PoolId, Timestamp};
use crate::error::{LedgerError, LedgerResult};

/// Pool lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    /// Created, not yet open for investment
    #[default]
    Draft,
    /// Open for investment
    Active,
    /// Capacity fully reserved
    Funded,
    /// Loan term elapsed past activation; returns due
    Matured,
    /// All accepted investments redeemed
    Completed,
    /// Abandoned before any funds were committed
    Cancelled,
}

impl PoolStatus {
    /// Whether the pool accepts new investments.
    pub fn accepts_investments(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a transition to `target` is allowed.
    pub fn can_transition_to(&self, target: PoolStatus) -> bool {
        match (self, target) {
            (Self::Draft, Self::Active) => true,
            (Self::Draft, Self::Cancelled) => true,
            (Self::Active, Self::Funded) => true,
            (Self::Active, Self::Matured) => true,
            (Self::Active, Self::Cancelled) => true,
            (Self::Funded, Self::Matured) => true,
            (Self::Matured, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Funded => write!(f, "funded"),
            Self::Matured => write!(f, "matured"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Pool creation spec, validated before a pool exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSpec {
    /// Display title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Creator identity; grants the Creator milestone when present
    pub creator: Option<InvestorId>,

    /// Capacity in the smallest currency unit
    pub funding_goal: u64,

    /// Annual interest rate in basis points (0..=10_000)
    pub interest_rate_bps: u32,

    /// Loan term in seconds
    pub loan_term_secs: u64,

    /// Per-transaction investment minimum
    pub min_investment: u64,

    /// Source repository, if the project publishes one
    pub github_url: Option<String>,

    /// Live deployment, if the project publishes one
    pub live_url: Option<String>,
}

impl PoolSpec {
    pub fn new(
        title: impl Into<String>,
        funding_goal: u64,
        interest_rate_bps: u32,
        loan_term_secs: u64,
        min_investment: u64,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            creator: None,
            funding_goal,
            interest_rate_bps,
            loan_term_secs,
            min_investment,
            github_url: None,
            live_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_creator(mut self, creator: InvestorId) -> Self {
        self.creator = Some(creator);
        self
    }

    /// Validate the spec; every violation is `InvalidSpec`.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::InvalidSpec {
                reason: "title must not be empty".to_string(),
            });
        }
        if self.funding_goal == 0 {
            return Err(LedgerError::InvalidSpec {
                reason: "funding_goal must be positive".to_string(),
            });
        }
        if self.min_investment == 0 {
            return Err(LedgerError::InvalidSpec {
                reason: "min_investment must be positive".to_string(),
            });
        }
        if self.min_investment > self.funding_goal {
            return Err(LedgerError::InvalidSpec {
                reason: format!(
                    "min_investment {} exceeds funding_goal {}",
                    self.min_investment, self.funding_goal
                ),
            });
        }
        if u64::from(self.interest_rate_bps) > crate::constants::BPS_DENOMINATOR {
            return Err(LedgerError::InvalidSpec {
                reason: format!("interest_rate_bps {} exceeds 10000", self.interest_rate_bps),
            });
        }
        if self.loan_term_secs == 0 {
            return Err(LedgerError::InvalidSpec {
                reason: "loan_term_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Pool record
///
/// Owned by the registry, mutated only by its `PoolLedger`. The ledger is
/// the sole writer of `total_raised` and `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub title: String,
    pub description: String,
    pub creator: Option<InvestorId>,
    pub funding_goal: u64,
    pub total_raised: u64,
    pub interest_rate_bps: u32,
    pub loan_term_secs: u64,
    pub min_investment: u64,
    pub status: PoolStatus,
    pub created_at: Timestamp,
    /// Set on activation; maturity is measured from here
    pub activated_at: Option<Timestamp>,
    /// Count of accepted investments; the next acceptance ordinal
    pub accepted_count: u64,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
}

impl Pool {
    /// Create a pool in `Draft` from a validated spec.
    pub fn new(id: PoolId, spec: PoolSpec, now: Timestamp) -> Self {
        Self {
            id,
            title: spec.title,
            description: spec.description,
            creator: spec.creator,
            funding_goal: spec.funding_goal,
            total_raised: 0,
            interest_rate_bps: spec.interest_rate_bps,
            loan_term_secs: spec.loan_term_secs,
            min_investment: spec.min_investment,
            status: PoolStatus::Draft,
            created_at: now,
            activated_at: None,
            accepted_count: 0,
            github_url: spec.github_url,
            live_url: spec.live_url,
        }
    }

    /// Amount still investable.
    pub fn remaining_capacity(&self) -> u64 {
        self.funding_goal.saturating_sub(self.total_raised)
    }

    /// The instant past which the pool is matured, if activated.
    pub fn matures_at(&self) -> Option<Timestamp> {
        self.activated_at
            .map(|at| at.saturating_add_secs(self.loan_term_secs))
    }
}

/// Read-only consistent copy of a pool, safe to hand to external consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub title: String,
    pub description: String,
    pub creator: Option<InvestorId>,
    pub funding_goal: u64,
    pub total_raised: u64,
    pub remaining_capacity: u64,
    pub interest_rate_bps: u32,
    pub loan_term_secs: u64,
    pub min_investment: u64,
    pub status: PoolStatus,
    pub created_at: Timestamp,
    pub activated_at: Option<Timestamp>,
    pub matures_at: Option<Timestamp>,
    pub accepted_count: u64,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
}

impl From<&Pool> for PoolSnapshot {
    fn from(pool: &Pool) -> Self {
        Self {
            id: pool.id.clone(),
            title: pool.title.clone(),
            description: pool.description.clone(),
            creator: pool.creator.clone(),
            funding_goal: pool.funding_goal,
            total_raised: pool.total_raised,
            remaining_capacity: pool.remaining_capacity(),
            interest_rate_bps: pool.interest_rate_bps,
            loan_term_secs: pool.loan_term_secs,
            min_investment: pool.min_investment,
            status: pool.status,
            created_at: pool.created_at,
            activated_at: pool.activated_at,
            matures_at: pool.matures_at(),
            accepted_count: pool.accepted_count,
            github_url: pool.github_url.clone(),
            live_url: pool.live_url.clone(),
        }
    }
}
