//! Wire DTOs
//!
//! Request/response types are kept separate from domain types: amounts stay
//! integer smallest-units on the wire, statuses and enums travel as
//! snake_case strings, timestamps as RFC 3339 UTC datetimes.

use chrono::{DateTime, Utc};
use pool_core::types::{
    AchievementRecord, Investment, InvestmentReceipt, InvestorId, PoolSnapshot, PoolSpec,
    PoolStatus, Redemption, Timestamp,
};
use pool_core::{MaturitySweep, PlatformStats};
use serde::{Deserialize, Serialize};

// ============ Requests ============

/// Create pool request
#[derive(Debug, Deserialize)]
pub struct CreatePoolRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub creator: Option<String>,
    pub funding_goal: u64,
    pub interest_rate_bps: u32,
    pub loan_term_secs: u64,
    pub min_investment: u64,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
}

impl CreatePoolRequest {
    pub fn into_spec(self) -> PoolSpec {
        PoolSpec {
            title: self.title,
            description: self.description,
            creator: self.creator.map(InvestorId::new),
            funding_goal: self.funding_goal,
            interest_rate_bps: self.interest_rate_bps,
            loan_term_secs: self.loan_term_secs,
            min_investment: self.min_investment,
            github_url: self.github_url,
            live_url: self.live_url,
        }
    }
}

/// Invest request
#[derive(Debug, Deserialize)]
pub struct InvestRequest {
    pub investor: String,
    pub amount: u64,
    /// Optional; generated server-side when absent (the caller then loses
    /// safe-retry, so clients are expected to send one)
    pub idempotency_key: Option<String>,
}

/// Redeem request
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub investor: String,
}

/// Pool list query params
#[derive(Debug, Deserialize)]
pub struct ListPoolsQuery {
    pub status: Option<String>,
}

// ============ Responses ============

/// Pool response
#[derive(Debug, Serialize)]
pub struct PoolResponse {
    pub pool_id: String,
    pub title: String,
    pub description: String,
    pub creator: Option<String>,
    pub funding_goal: u64,
    pub total_raised: u64,
    pub remaining_capacity: u64,
    pub interest_rate_bps: u32,
    pub loan_term_secs: u64,
    pub min_investment: u64,
    pub status: String,
    pub accepted_count: u64,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub matures_at: Option<DateTime<Utc>>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
}

impl From<PoolSnapshot> for PoolResponse {
    fn from(snapshot: PoolSnapshot) -> Self {
        Self {
            pool_id: snapshot.id.to_string(),
            title: snapshot.title,
            description: snapshot.description,
            creator: snapshot.creator.map(|c| c.to_string()),
            funding_goal: snapshot.funding_goal,
            total_raised: snapshot.total_raised,
            remaining_capacity: snapshot.remaining_capacity,
            interest_rate_bps: snapshot.interest_rate_bps,
            loan_term_secs: snapshot.loan_term_secs,
            min_investment: snapshot.min_investment,
            status: snapshot.status.to_string(),
            accepted_count: snapshot.accepted_count,
            created_at: ts_to_datetime(snapshot.created_at),
            activated_at: snapshot.activated_at.map(ts_to_datetime),
            matures_at: snapshot.matures_at.map(ts_to_datetime),
            github_url: snapshot.github_url,
            live_url: snapshot.live_url,
        }
    }
}

/// Investment receipt response
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub investment_id: String,
    pub pool_id: String,
    pub investor: String,
    pub amount: u64,
    pub expected_return: u64,
    pub accepted_at: DateTime<Utc>,
    pub maturity_at: DateTime<Utc>,
    pub ordinal: u64,
}

impl From<InvestmentReceipt> for ReceiptResponse {
    fn from(receipt: InvestmentReceipt) -> Self {
        Self {
            investment_id: receipt.investment_id.to_string(),
            pool_id: receipt.pool_id.to_string(),
            investor: receipt.investor.to_string(),
            amount: receipt.amount,
            expected_return: receipt.expected_return,
            accepted_at: ts_to_datetime(receipt.accepted_at),
            maturity_at: ts_to_datetime(receipt.maturity_at),
            ordinal: receipt.ordinal,
        }
    }
}

/// Full investment record response (rejected records included)
#[derive(Debug, Serialize)]
pub struct InvestmentResponse {
    pub investment_id: String,
    pub pool_id: String,
    pub investor: String,
    pub amount: u64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expected_return: Option<u64>,
    pub maturity_at: Option<DateTime<Utc>>,
    pub ordinal: Option<u64>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl From<Investment> for InvestmentResponse {
    fn from(investment: Investment) -> Self {
        Self {
            investment_id: investment.id.to_string(),
            pool_id: investment.pool_id.to_string(),
            investor: investment.investor.to_string(),
            amount: investment.amount,
            status: investment.status.to_string(),
            created_at: ts_to_datetime(investment.created_at),
            accepted_at: investment.accepted_at.map(ts_to_datetime),
            expected_return: investment.expected_return,
            maturity_at: investment.maturity_at.map(ts_to_datetime),
            ordinal: investment.ordinal,
            redeemed_at: investment.redeemed_at.map(ts_to_datetime),
            rejection_reason: investment.rejection_reason.map(|r| r.to_string()),
        }
    }
}

/// Redemption response
#[derive(Debug, Serialize)]
pub struct RedemptionResponse {
    pub investment_id: String,
    pub investor: String,
    pub payout: u64,
    pub redeemed_at: DateTime<Utc>,
}

impl From<Redemption> for RedemptionResponse {
    fn from(redemption: Redemption) -> Self {
        Self {
            investment_id: redemption.investment_id.to_string(),
            investor: redemption.investor.to_string(),
            payout: redemption.payout,
            redeemed_at: ts_to_datetime(redemption.redeemed_at),
        }
    }
}

/// Achievement response
#[derive(Debug, Serialize)]
pub struct AchievementResponse {
    pub investor: String,
    pub tier: String,
    pub cumulative_invested: u64,
    pub milestones: Vec<String>,
}

impl From<AchievementRecord> for AchievementResponse {
    fn from(record: AchievementRecord) -> Self {
        Self {
            investor: record.investor.to_string(),
            tier: record.tier.to_string(),
            cumulative_invested: record.cumulative_invested,
            milestones: record.milestones.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Platform stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_pools: u64,
    pub active_pools: u64,
    pub funded_pools: u64,
    pub matured_pools: u64,
    pub total_raised: u64,
    pub total_investors: u64,
    pub total_investments: u64,
    pub rejected_investments: u64,
}

impl From<PlatformStats> for StatsResponse {
    fn from(stats: PlatformStats) -> Self {
        Self {
            total_pools: stats.total_pools,
            active_pools: stats.active_pools,
            funded_pools: stats.funded_pools,
            matured_pools: stats.matured_pools,
            total_raised: stats.total_raised,
            total_investors: stats.total_investors,
            total_investments: stats.total_investments,
            rejected_investments: stats.rejected_investments,
        }
    }
}

/// Maturity sweep response
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub pools_matured: u64,
    pub investments_matured: u64,
}

impl From<MaturitySweep> for SweepResponse {
    fn from(sweep: MaturitySweep) -> Self {
        Self {
            pools_matured: sweep.pools_matured,
            investments_matured: sweep.investments_matured,
        }
    }
}

// ============ Helpers ============

/// Unix-seconds to wire datetime.
pub fn ts_to_datetime(ts: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.as_secs() as i64, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Parse a pool status filter from a query string.
pub fn str_to_pool_status(s: &str) -> Option<PoolStatus> {
    match s.to_lowercase().as_str() {
        "draft" => Some(PoolStatus::Draft),
        "active" => Some(PoolStatus::Active),
        "funded" => Some(PoolStatus::Funded),
        "matured" => Some(PoolStatus::Matured),
        "completed" => Some(PoolStatus::Completed),
        "cancelled" => Some(PoolStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_to_pool_status() {
        assert_eq!(str_to_pool_status("active"), Some(PoolStatus::Active));
        assert_eq!(str_to_pool_status("Funded"), Some(PoolStatus::Funded));
        assert_eq!(str_to_pool_status("bogus"), None);
    }

    #[test]
    fn test_status_roundtrip_via_display() {
        for status in [
            PoolStatus::Draft,
            PoolStatus::Active,
            PoolStatus::Funded,
            PoolStatus::Matured,
            PoolStatus::Completed,
            PoolStatus::Cancelled,
        ] {
            assert_eq!(str_to_pool_status(&status.to_string()), Some(status));
        }
    }

    #[test]
    fn test_ts_to_datetime() {
        let dt = ts_to_datetime(Timestamp::from_secs(0));
        assert_eq!(dt, DateTime::<Utc>::UNIX_EPOCH);
    }
}
