//! API route handlers

pub mod achievement;
pub mod health;
pub mod investment;
pub mod pool;

use axum::{routing::get, routing::post, Router};

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        // Pool endpoints
        .route("/pools", post(pool::create_pool).get(pool::list_pools))
        .route("/pools/:pool_id", get(pool::get_pool))
        .route("/pools/:pool_id/activate", post(pool::activate_pool))
        .route("/pools/:pool_id/cancel", post(pool::cancel_pool))
        .route("/pools/maturity/sweep", post(pool::sweep_maturity))
        // Investment endpoints
        .route("/pools/:pool_id/investments", post(investment::invest))
        .route(
            "/investments/:investment_id",
            get(investment::get_investment),
        )
        .route(
            "/investments/:investment_id/redeem",
            post(investment::redeem),
        )
        .route(
            "/investors/:investor/investments",
            get(investment::list_by_investor),
        )
        // Achievement endpoints
        .route(
            "/investors/:investor/connect",
            post(achievement::connect_investor),
        )
        .route(
            "/investors/:investor/achievements",
            get(achievement::get_achievements),
        )
        // Stats
        .route("/stats", get(pool::get_stats))
        // State
        .with_state(state)
}
