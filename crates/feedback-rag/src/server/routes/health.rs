//! Health and readiness endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::learning::WarmStart;
use crate::server::state::AppState;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Dependency status report
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when every dependency answered, "degraded" otherwise
    pub status: &'static str,
    pub ledger: String,
    pub vector_search: String,
    pub embedding: String,
    pub llm: String,
}

/// Readiness report
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_start: Option<WarmStart>,
}

async fn probe<F>(check: F) -> String
where
    F: Future<Output = Result<bool>>,
{
    match tokio::time::timeout(PROBE_TIMEOUT, check).await {
        Ok(Ok(true)) => "ok".to_string(),
        Ok(Ok(false)) => "unavailable".to_string(),
        Ok(Err(e)) => format!("error: {}", e),
        Err(_) => "error: timed out".to_string(),
    }
}

/// GET /health - Liveness plus dependency checks
///
/// Always 200; a failing dependency turns the status to "degraded".
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (ledger, vector_search, embedding, llm) = tokio::join!(
        probe(state.ledger().health_check()),
        probe(state.vector_search().health_check()),
        probe(state.embedding_provider().health_check()),
        probe(state.llm_provider().health_check()),
    );

    let healthy = [&ledger, &vector_search, &embedding, &llm]
        .iter()
        .all(|s| s.as_str() == "ok");

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        ledger,
        vector_search,
        embedding,
        llm,
    })
}

/// GET /ready - 200 once the warm start has run
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let warm_start = state.warm_start_outcome();
    let ready = warm_start.is_some();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadyResponse { ready, warm_start }))
}
