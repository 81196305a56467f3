//! Achievement endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use pool_core::types::InvestorId;

use crate::dto::AchievementResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Explicit session connect; grants the welcome milestone
pub async fn connect_investor(
    State(state): State<AppState>,
    Path(investor): Path<String>,
) -> ApiResult<Json<AchievementResponse>> {
    let record = state
        .service
        .connect_investor(&InvestorId::new(investor))
        .await?;
    Ok(Json(record.into()))
}

/// Derived tier and milestones for one investor
pub async fn get_achievements(
    State(state): State<AppState>,
    Path(investor): Path<String>,
) -> ApiResult<Json<AchievementResponse>> {
    let record = state
        .service
        .achievements(&InvestorId::new(investor))
        .await?;
    Ok(Json(record.into()))
}
