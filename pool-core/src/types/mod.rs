//! Core types shared across the ledger

pub mod achievement;
pub mod common;
pub mod investment;
pub mod pool;

pub use achievement::{AchievementRecord, Milestone, Tier};
pub use common::{IdempotencyKey, InvestmentId, InvestorId, PoolId, Timestamp};
pub use investment::{
    Investment, InvestmentReceipt, InvestmentStatus, Redemption, RejectionReason,
};
pub use pool::{Pool, PoolSnapshot, PoolSpec, PoolStatus};
