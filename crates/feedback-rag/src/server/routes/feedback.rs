//! Feedback endpoint

use axum::{extract::State, http::StatusCode, Json};

use crate::error::Result;
use crate::server::extract::ValidJson;
use crate::server::state::AppState;
use crate::types::{FeedbackRequest, FeedbackResponse};

/// POST /feedback - Record a thumbs up/down for an answer's sources
///
/// 200 when the event is durable, 202 when it was applied in memory but the
/// ledger append failed. Unknown labels never get this far: the body fails
/// to deserialize and the request is answered with a 422 `validation_error`.
pub async fn submit_feedback(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>)> {
    state.ensure_ready()?;

    let response = state.feedback().submit(request).await;
    let status = if response.durable {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };

    Ok((status, Json(response)))
}
