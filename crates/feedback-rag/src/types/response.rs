//! Candidate and response types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::providers::vector_search::SearchHit;

/// Metadata key holding a candidate's stable URL
pub const URL_METADATA_KEY: &str = "url";

/// A retrieval result, annotated with scores once re-ranked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    /// Chunk text
    pub content: String,
    /// Arm identity: the source URL, or a content hash when no URL is present
    pub arm_id: String,
    /// Metadata returned by the vector store
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Score from the vector search (higher is more relevant)
    pub similarity_score: f64,
    /// Learned feedback score (0.0 until re-ranked)
    pub bandit_score: f64,
    /// similarity_score + bandit_score
    pub final_score: f64,
}

impl Candidate {
    /// Build an un-ranked candidate from a vector search hit
    pub fn from_hit(hit: SearchHit) -> Self {
        let arm_id = arm_id_for(&hit.content, &hit.metadata);
        Self {
            content: hit.content,
            arm_id,
            metadata: hit.metadata,
            similarity_score: hit.similarity,
            bandit_score: 0.0,
            final_score: hit.similarity,
        }
    }

    /// Source URL, if the vector store supplied one
    pub fn url(&self) -> Option<&str> {
        self.metadata
            .get(URL_METADATA_KEY)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }
}

/// Stable identity for a candidate.
///
/// Uses the `url` metadata field when present; otherwise `sha256:<hex>` of the content.
pub fn arm_id_for(content: &str, metadata: &Map<String, Value>) -> String {
    if let Some(url) = metadata
        .get(URL_METADATA_KEY)
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
    {
        return url.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Response for the ask endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The question as asked
    pub query: String,
    /// Generated answer
    pub answer: String,
    /// Arm identities of the sources, in ranked order
    pub sources: Vec<String>,
    /// Final scores, parallel to `sources`
    pub scores: Vec<f64>,
    /// Vector similarity scores, parallel to `sources`
    pub similarity_scores: Vec<f64>,
    /// Feedback (bandit) scores, parallel to `sources`
    pub bandit_scores: Vec<f64>,
    /// Generation model
    pub model: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Assemble the response from the ranked candidates
    pub fn new(
        query: String,
        answer: String,
        candidates: &[Candidate],
        model: String,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            query,
            answer,
            sources: candidates.iter().map(|c| c.arm_id.clone()).collect(),
            scores: candidates.iter().map(|c| c.final_score).collect(),
            similarity_scores: candidates.iter().map(|c| c.similarity_score).collect(),
            bandit_scores: candidates.iter().map(|c| c.bandit_score).collect(),
            model,
            processing_time_ms,
        }
    }
}

/// Response for the retrieve endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub candidates: Vec<Candidate>,
    pub processing_time_ms: u64,
}
