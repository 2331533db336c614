//! API routes for the RAG server

pub mod ask;
pub mod bandit;
pub mod feedback;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Query
        .route("/ask", post(ask::ask))
        .route("/retrieve", post(ask::retrieve))
        // Feedback
        .route("/feedback", post(feedback::submit_feedback))
        // Observability
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/bandit", get(bandit::bandit_snapshot))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "feedback-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented answers re-ranked by user feedback (UCB1)",
        "endpoints": {
            "POST /ask": "Answer a question with feedback-aware sources",
            "POST /retrieve": "Re-ranked candidates with similarity, bandit and final scores",
            "POST /feedback": "Record positive/negative feedback for an answer's sources",
            "GET /health": "Dependency status (ok/degraded)",
            "GET /ready": "Readiness after feedback history is loaded",
            "GET /bandit": "Per-source feedback statistics and scores"
        }
    }))
}
