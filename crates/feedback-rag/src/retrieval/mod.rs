//! Retrieval and feedback-aware re-ranking

pub mod rerank;
pub mod search;

pub use rerank::rerank;
pub use search::FeedbackAwareRetriever;
