//! feedback-rag: retrieval-augmented question answering with feedback-aware re-ranking
//!
//! Candidates from an external vector search are re-ranked by adding a UCB1
//! score learned from thumbs-up/down feedback to their similarity. Feedback is
//! applied in memory immediately and appended to a SQLite reward ledger, which
//! is replayed into the bandit at startup.

pub mod config;
pub mod error;
pub mod generation;
pub mod learning;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use learning::{BanditScorer, FeedbackService, Reward, WarmStart};
pub use retrieval::{rerank, FeedbackAwareRetriever};
pub use server::{build_router, state::AppState, RagServer};
pub use types::{Candidate, FeedbackRequest, FeedbackResponse, QueryRequest, QueryResponse};
