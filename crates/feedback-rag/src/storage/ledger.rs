//! Reward ledger: the append-only system of record for feedback events

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::FeedbackEvent;

/// Trait for durable feedback storage
///
/// Implementations:
/// - `SqliteLedger`: local SQLite database
/// - `UnavailableLedger`: stand-in when the store could not be opened
#[async_trait]
pub trait RewardLedger: Send + Sync {
    /// Append one event. Returns the event's id.
    async fn append_feedback(&self, event: &FeedbackEvent) -> Result<Uuid>;

    /// Read events in insertion order.
    ///
    /// A page shorter than `page_size` (or empty) means the ledger is exhausted.
    async fn read_feedback_page(&self, offset: usize, page_size: usize)
        -> Result<Vec<FeedbackEvent>>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Ledger that rejects every call.
///
/// Used when the real store cannot be opened at startup so the service can
/// still answer queries with a neutral bandit contribution.
pub struct UnavailableLedger {
    reason: String,
}

impl UnavailableLedger {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RewardLedger for UnavailableLedger {
    async fn append_feedback(&self, _event: &FeedbackEvent) -> Result<Uuid> {
        Err(Error::ledger(format!("ledger unavailable: {}", self.reason)))
    }

    async fn read_feedback_page(
        &self,
        _offset: usize,
        _page_size: usize,
    ) -> Result<Vec<FeedbackEvent>> {
        Err(Error::ledger(format!("ledger unavailable: {}", self.reason)))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
