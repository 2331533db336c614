//! Bandit inspection endpoint

use axum::{extract::State, Json};

use crate::learning::BanditSnapshot;
use crate::server::state::AppState;

/// GET /bandit - Per-arm statistics and current scores
pub async fn bandit_snapshot(State(state): State<AppState>) -> Json<BanditSnapshot> {
    Json(state.bandit().snapshot())
}
