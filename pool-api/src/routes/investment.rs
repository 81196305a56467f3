//! Investment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pool_core::types::{IdempotencyKey, InvestmentId, InvestorId, PoolId};

use crate::dto::{
    InvestRequest, InvestmentResponse, ReceiptResponse, RedeemRequest, RedemptionResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Submit an investment against a pool
pub async fn invest(
    State(state): State<AppState>,
    Path(pool_id): Path<String>,
    Json(req): Json<InvestRequest>,
) -> ApiResult<(StatusCode, Json<ReceiptResponse>)> {
    if req.investor.trim().is_empty() {
        return Err(ApiError::Validation("investor must not be empty".to_string()));
    }

    let key = match req.idempotency_key {
        Some(key) => IdempotencyKey::new(key),
        None => IdempotencyKey::generate(),
    };

    let receipt = state
        .service
        .invest(
            &PoolId::new(pool_id),
            &InvestorId::new(req.investor),
            req.amount,
            &key,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// Get one investment record (rejected ones included)
pub async fn get_investment(
    State(state): State<AppState>,
    Path(investment_id): Path<String>,
) -> ApiResult<Json<InvestmentResponse>> {
    let investment = state
        .service
        .get_investment(&InvestmentId::new(investment_id))
        .await?;
    Ok(Json(investment.into()))
}

/// List an investor's records across all pools
pub async fn list_by_investor(
    State(state): State<AppState>,
    Path(investor): Path<String>,
) -> ApiResult<Json<Vec<InvestmentResponse>>> {
    let records = state
        .service
        .list_investments_by_investor(&InvestorId::new(investor))
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Redeem a matured investment
pub async fn redeem(
    State(state): State<AppState>,
    Path(investment_id): Path<String>,
    Json(req): Json<RedeemRequest>,
) -> ApiResult<Json<RedemptionResponse>> {
    let redemption = state
        .service
        .redeem(
            &InvestmentId::new(investment_id),
            &InvestorId::new(req.investor),
        )
        .await?;
    Ok(Json(redemption.into()))
}
