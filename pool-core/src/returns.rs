//! Returns calculation
//!
//! Pure simple-interest quotes over a fixed term. The quote is computed once
//! at acceptance and frozen on the investment record; nothing here reads or
//! writes state.

use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;
use crate::money;
use crate::types::Timestamp;

/// Quote for one principal over one term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnsQuote {
    /// Interest due at maturity
    pub interest: u64,
    /// Principal plus interest
    pub total: u64,
    /// Instant the term elapses
    pub maturity_at: Timestamp,
}

/// Returns calculator
///
/// Simple (non-compounding) interest over the full term:
/// `principal * rate_bps/10_000 * term/SECONDS_PER_YEAR`, fixed-point with
/// banker's rounding. The only failure mode is arithmetic overflow from a
/// misconfigured rate/term/amount combination.
pub struct ReturnsCalculator;

impl ReturnsCalculator {
    /// Compute the frozen quote for an investment accepted at `accepted_at`.
    pub fn compute_returns(
        principal: u64,
        rate_bps: u32,
        term_secs: u64,
        accepted_at: Timestamp,
    ) -> LedgerResult<ReturnsQuote> {
        let interest = money::pro_rata_by_time(principal, rate_bps, term_secs, term_secs)?;
        let total = money::add(principal, interest)?;
        let maturity_at = accepted_at.saturating_add_secs(term_secs);

        Ok(ReturnsQuote {
            interest,
            total,
            maturity_at,
        })
    }

    /// Interest accrued part-way through the term; used for projections,
    /// never for settlement (settlement uses the frozen quote).
    pub fn accrued_interest(
        principal: u64,
        rate_bps: u32,
        elapsed_secs: u64,
        term_secs: u64,
    ) -> LedgerResult<u64> {
        money::pro_rata_by_time(principal, rate_bps, elapsed_secs, term_secs)
    }
}
