//! Feedback types: the user's thumbs up / thumbs down on an answer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::learning::Reward;

/// Binary feedback label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackLabel {
    /// Answer was helpful
    Positive,
    /// Answer was not helpful
    Negative,
}

impl FeedbackLabel {
    /// Reward credited to every cited source
    pub fn reward(&self) -> Reward {
        match self {
            FeedbackLabel::Positive => Reward::POSITIVE,
            FeedbackLabel::Negative => Reward::NEGATIVE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackLabel::Positive => "positive",
            FeedbackLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for FeedbackLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(FeedbackLabel::Positive),
            "negative" => Ok(FeedbackLabel::Negative),
            other => Err(Error::validation(format!(
                "feedback must be \"positive\" or \"negative\", got {:?}",
                other
            ))),
        }
    }
}

/// Feedback request from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// The question that was asked
    pub query: String,
    /// The answer that was judged
    pub answer: String,
    /// Arm identities (source URLs) cited in the answer, in order
    #[serde(default)]
    pub sources: Vec<String>,
    /// The judgment
    pub feedback: FeedbackLabel,
}

/// One persisted user judgment. Immutable once written to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEvent {
    pub feedback_id: Uuid,
    pub query: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub label: FeedbackLabel,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEvent {
    /// Stamp a request with a fresh id and the current time
    pub fn from_request(request: FeedbackRequest) -> Self {
        Self {
            feedback_id: Uuid::new_v4(),
            query: request.query,
            answer: request.answer,
            sources: request.sources,
            label: request.feedback,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a feedback submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    /// Applied in memory and written to the ledger
    Success,
    /// Applied in memory, ledger write failed or timed out
    RecordedNotDurable,
}

/// Response for the feedback endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: FeedbackStatus,
    pub message: String,
    pub feedback_id: Uuid,
    /// Whether the event reached the ledger
    pub durable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_error: Option<String>,
}
