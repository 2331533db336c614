//! Rebuild the bandit from the reward ledger at process start

use serde::Serialize;

use super::bandit::{BanditScorer, BanditState};
use crate::error::{Error, Result};
use crate::storage::RewardLedger;

/// What the warm start did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WarmStart {
    /// History was replayed into the scorer
    Loaded {
        events: usize,
        updates: u64,
        arms: usize,
    },
    /// The ledger could not be read; the scorer starts empty
    ColdStart { reason: String },
    /// The scorer had already been warm-started; nothing was replayed
    AlreadyLoaded,
}

/// Result of replaying a ledger into a fresh state
#[derive(Debug, Clone)]
pub struct Rebuild {
    pub state: BanditState,
    pub events: usize,
}

/// Replays the reward ledger page by page
pub struct WarmStartLoader<'a> {
    ledger: &'a dyn RewardLedger,
    page_size: usize,
}

impl<'a> WarmStartLoader<'a> {
    pub fn new(ledger: &'a dyn RewardLedger, page_size: usize) -> Self {
        Self {
            ledger,
            page_size: page_size.max(1),
        }
    }

    /// Replay every event into a fresh state.
    ///
    /// Each event credits its reward to every cited source, so one event
    /// with N sources adds N pulls.
    pub async fn rebuild(&self) -> Result<Rebuild> {
        let mut state = BanditState::new();
        let mut events = 0usize;
        let mut offset = 0usize;

        loop {
            let page = self
                .ledger
                .read_feedback_page(offset, self.page_size)
                .await?;
            let len = page.len();

            for event in &page {
                let reward = event.label.reward();
                for arm_id in &event.sources {
                    state.update(arm_id, reward);
                }
            }
            events += len;

            tracing::debug!("Replayed ledger page at offset {} ({} events)", offset, len);

            if len < self.page_size {
                break;
            }
            offset += len;
        }

        Ok(Rebuild { state, events })
    }

    /// Load history into `scorer`, at most once per scorer.
    ///
    /// A read failure at any page leaves the scorer untouched and reports a
    /// cold start; nothing from the partial read is applied.
    pub async fn warm_start(&self, scorer: &BanditScorer) -> WarmStart {
        if !scorer.begin_warm_start() {
            tracing::warn!("Bandit already warm-started; skipping ledger replay");
            return WarmStart::AlreadyLoaded;
        }

        match self.rebuild().await {
            Ok(Rebuild { state, events }) => {
                let updates = state.total_pulls();
                let arms = state.arm_count();
                scorer.absorb(state);
                tracing::info!(
                    "Loaded {} feedback records from {} ledger ({} updates, {} arms)",
                    events,
                    self.ledger.name(),
                    updates,
                    arms
                );
                WarmStart::Loaded {
                    events,
                    updates,
                    arms,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load feedback from {} ledger, starting cold: {}",
                    self.ledger.name(),
                    e
                );
                WarmStart::ColdStart {
                    reason: cold_start_reason(&e),
                }
            }
        }
    }
}

fn cold_start_reason(err: &Error) -> String {
    err.to_string()
}
