//! Pool endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pool_core::types::PoolId;

use crate::dto::{
    str_to_pool_status, CreatePoolRequest, ListPoolsQuery, PoolResponse, StatsResponse,
    SweepResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create a pool in draft
pub async fn create_pool(
    State(state): State<AppState>,
    Json(req): Json<CreatePoolRequest>,
) -> ApiResult<(StatusCode, Json<PoolResponse>)> {
    let pool_id = state.service.create_pool(req.into_spec()).await?;
    let snapshot = state.service.get_pool(&pool_id).await?;
    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// Activate a draft pool
pub async fn activate_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<String>,
) -> ApiResult<Json<PoolResponse>> {
    let snapshot = state
        .service
        .activate_pool(&PoolId::new(pool_id))
        .await?;
    Ok(Json(snapshot.into()))
}

/// Cancel a pool; refused once any funds are committed
pub async fn cancel_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<String>,
) -> ApiResult<Json<PoolResponse>> {
    let snapshot = state.service.cancel_pool(&PoolId::new(pool_id)).await?;
    Ok(Json(snapshot.into()))
}

/// Get a pool snapshot
pub async fn get_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<String>,
) -> ApiResult<Json<PoolResponse>> {
    let snapshot = state.service.get_pool(&PoolId::new(pool_id)).await?;
    Ok(Json(snapshot.into()))
}

/// List pools, optionally filtered by status
pub async fn list_pools(
    State(state): State<AppState>,
    Query(params): Query<ListPoolsQuery>,
) -> ApiResult<Json<Vec<PoolResponse>>> {
    let status = match params.status.as_deref() {
        Some(s) => Some(str_to_pool_status(s).ok_or_else(|| {
            ApiError::Validation(format!("Unknown pool status: {s}"))
        })?),
        None => None,
    };

    let snapshots = state.service.list_pools(status).await?;
    Ok(Json(snapshots.into_iter().map(Into::into).collect()))
}

/// Run a maturity sweep across all pools
pub async fn sweep_maturity(
    State(state): State<AppState>,
) -> ApiResult<Json<SweepResponse>> {
    let sweep = state.service.sweep_maturity().await?;
    Ok(Json(sweep.into()))
}

/// Platform-wide stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = state.service.platform_stats().await?;
    Ok(Json(stats.into()))
}
