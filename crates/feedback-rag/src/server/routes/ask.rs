//! Question answering and retrieval endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::server::extract::ValidJson;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse, RetrieveResponse};

/// POST /ask - Answer a question from feedback-aware retrieval
pub async fn ask(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    state.ensure_ready()?;
    let top_k = request.validate(&state.config().ranking)?;
    let start = Instant::now();

    tracing::info!("Query: \"{}\" (top_k={})", request.query, top_k);

    let candidates = state.retriever().retrieve(&request.query, top_k).await?;
    let context = PromptBuilder::build_context(&candidates);

    let llm = state.llm_provider();
    let answer = llm.generate_answer(&request.query, &context).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Answered with {} sources in {}ms",
        candidates.len(),
        processing_time_ms
    );

    Ok(Json(QueryResponse::new(
        request.query,
        answer,
        &candidates,
        llm.model().to_string(),
        processing_time_ms,
    )))
}

/// POST /retrieve - Ranked candidates with their scores, without generation
pub async fn retrieve(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<QueryRequest>,
) -> Result<Json<RetrieveResponse>> {
    state.ensure_ready()?;
    let top_k = request.validate(&state.config().ranking)?;
    let start = Instant::now();

    let candidates = state.retriever().retrieve(&request.query, top_k).await?;

    Ok(Json(RetrieveResponse {
        query: request.query,
        candidates,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
