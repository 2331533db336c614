//! Core types for the RAG service

pub mod feedback;
pub mod query;
pub mod response;

pub use feedback::{FeedbackEvent, FeedbackLabel, FeedbackRequest, FeedbackResponse, FeedbackStatus};
pub use query::QueryRequest;
pub use response::{Candidate, QueryResponse, RetrieveResponse};
