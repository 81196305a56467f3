//! Health endpoints

use axum::{extract::State, Json};
use serde_json::json;

use crate::state::AppState;

/// Liveness check
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": state.version,
    }))
}

/// Readiness check: verifies the ledger answers
pub async fn ready_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ready = state.service.platform_stats().await.is_ok();
    Json(json!({
        "ready": ready,
    }))
}
