//! Funding-pool ledger core
//!
//! Authoritative accounting for a project-funding platform: every pool
//! accepts investor contributions up to a fixed capacity, computes
//! deterministic returns, and derives achievement tiers from cumulative
//! contribution, while staying correct under concurrent investment
//! attempts.
//!
//! # Architecture
//!
//! - **Money**: fixed-point integer arithmetic; banker's rounding; overflow
//!   is fatal, never wrapped or clamped
//! - **PoolLedger**: one pool's state machine and capacity invariant; the
//!   unit of concurrency control (per-pool mutex, bounded lock wait)
//! - **InvestmentAllocator**: one investment end-to-end — idempotent replay,
//!   capacity reservation, frozen returns quote, audit of rejections
//! - **ReturnsCalculator**: pure simple-interest quotes
//! - **AchievementTierEngine**: pure tier derivation plus the first-K
//!   EarlySupporter rule
//! - **PoolRegistry**: process-wide id-to-ledger directory
//! - **InvestmentStore**: storage capability boundary with in-memory and
//!   sled-backed implementations
//!
//! # Hard invariants
//!
//! | Invariant | Enforced where |
//! |-----------|----------------|
//! | `0 <= total_raised <= funding_goal` | `PoolLedger::reserve_capacity` |
//! | `total_raised == sum(accepted amounts)` | allocator + store audit |
//! | funded flip atomic with the filling reservation | same critical section |
//! | no floating-point money anywhere | `money` module, integer-only API |
//! | replayed idempotency key counts once | allocator dedup check |
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pool_core::{LedgerConfig, LedgerService, MemoryStore, PoolSpec};
//! use pool_core::types::{IdempotencyKey, InvestorId};
//!
//! async fn example() {
//!     let service =
//!         LedgerService::with_defaults(LedgerConfig::default(), Arc::new(MemoryStore::new()));
//!
//!     let pool_id = service
//!         .create_pool(PoolSpec::new("Starlight bridge", 100_000, 850, 7_776_000, 100))
//!         .await
//!         .unwrap();
//!     service.activate_pool(&pool_id).await.unwrap();
//!
//!     let receipt = service
//!         .invest(
//!             &pool_id,
//!             &InvestorId::new("alice"),
//!             1_000,
//!             &IdempotencyKey::generate(),
//!         )
//!         .await
//!         .unwrap();
//!     println!("expected return: {}", receipt.expected_return);
//! }
//! ```

pub mod achievement;
pub mod allocator;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod money;
pub mod notify;
pub mod returns;
pub mod service;
pub mod store;
pub mod types;

pub use achievement::AchievementTierEngine;
pub use allocator::InvestmentAllocator;
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{PoolLedger, PoolRegistry, RegistryStats, Reservation};
pub use notify::{LedgerEvent, NotificationSink, TracingSink};
pub use returns::{ReturnsCalculator, ReturnsQuote};
pub use service::{LedgerService, MaturitySweep, PlatformStats};
pub use store::{InvestmentStore, MemoryStore, SledStore, StoreStats};
pub use types::{
    AchievementRecord, IdempotencyKey, Investment, InvestmentId, InvestmentReceipt,
    InvestmentStatus, InvestorId, Milestone, PoolId, PoolSnapshot, PoolSpec, PoolStatus,
    Redemption, RejectionReason, Tier, Timestamp,
};
