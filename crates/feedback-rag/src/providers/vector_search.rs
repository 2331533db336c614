//! Vector search provider trait for similarity retrieval

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::Result;

/// One row returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk text
    pub content: String,
    /// Free-form metadata; `url` identifies the source document
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Map<String, Value>,
    /// Similarity to the query, higher is closer
    #[serde(default)]
    pub similarity: f64,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Trait for similarity search over stored chunks
///
/// Implementations:
/// - `RpcVectorSearch`: PostgREST-style `match_documents` RPC
#[async_trait]
pub trait VectorSearchProvider: Send + Sync {
    /// Return up to `limit` hits, most similar first
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
