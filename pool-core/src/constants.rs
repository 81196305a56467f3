//! Ledger-wide constants

/// Basis-point denominator: 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Seconds per year used for annualized interest accrual.
///
/// Fixed by convention at 365 * 86_400; deliberately not calendar-aware so
/// that returns are reproducible bit-for-bit across platforms.
pub const SECONDS_PER_YEAR: u64 = 365 * 86_400;

/// Cumulative investment (smallest currency unit) at which Silver begins.
pub const SILVER_THRESHOLD: u64 = 1_000;

/// Cumulative investment above which Gold begins (Silver is inclusive of it).
pub const GOLD_THRESHOLD: u64 = 10_000;

/// Default number of earliest accepted investments per pool that qualify
/// for the EarlySupporter milestone.
pub const DEFAULT_EARLY_SUPPORTER_LIMIT: u64 = 10;

/// Default bounded wait for a per-pool critical section, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
