//! Feedback ingestion
//!
//! A feedback event updates the in-memory bandit first and is then appended
//! to the reward ledger. The in-memory update always happens for a valid
//! request; a ledger failure is reported back to the caller instead of being
//! swallowed.

use std::sync::Arc;
use std::time::Duration;

use super::bandit::BanditScorer;
use crate::error::Error;
use crate::storage::RewardLedger;
use crate::types::{FeedbackEvent, FeedbackRequest, FeedbackResponse, FeedbackStatus};

/// Applies feedback to the bandit and records it in the ledger
#[derive(Clone)]
pub struct FeedbackService {
    bandit: Arc<BanditScorer>,
    ledger: Arc<dyn RewardLedger>,
    append_timeout: Duration,
}

impl FeedbackService {
    pub fn new(
        bandit: Arc<BanditScorer>,
        ledger: Arc<dyn RewardLedger>,
        append_timeout: Duration,
    ) -> Self {
        Self {
            bandit,
            ledger,
            append_timeout,
        }
    }

    /// Record one feedback event.
    ///
    /// The label has already been validated by deserialization. Every source
    /// in the request, duplicates included, receives the label's reward.
    pub async fn submit(&self, request: FeedbackRequest) -> FeedbackResponse {
        let event = FeedbackEvent::from_request(request);
        let reward = event.label.reward();

        self.bandit.update_all(&event.sources, reward);

        tracing::info!(
            "Feedback {} ({}) applied to {} sources",
            event.feedback_id,
            event.label,
            event.sources.len()
        );

        match self.append(&event).await {
            Ok(_) => FeedbackResponse {
                status: FeedbackStatus::Success,
                message: "Feedback recorded".to_string(),
                feedback_id: event.feedback_id,
                durable: true,
                ledger_error: None,
            },
            Err(e) => {
                tracing::error!(
                    "Feedback {} applied in memory but not persisted: {}",
                    event.feedback_id,
                    e
                );
                FeedbackResponse {
                    status: FeedbackStatus::RecordedNotDurable,
                    message: "Feedback applied but could not be persisted; it will be lost on restart"
                        .to_string(),
                    feedback_id: event.feedback_id,
                    durable: false,
                    ledger_error: Some(e.to_string()),
                }
            }
        }
    }

    async fn append(&self, event: &FeedbackEvent) -> crate::Result<()> {
        match tokio::time::timeout(self.append_timeout, self.ledger.append_feedback(event)).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(Error::timeout("ledger append", self.append_timeout)),
        }
    }

    pub fn bandit(&self) -> &Arc<BanditScorer> {
        &self.bandit
    }

    pub fn ledger(&self) -> &Arc<dyn RewardLedger> {
        &self.ledger
    }
}
