//! Query request types

use serde::{Deserialize, Serialize};

use crate::config::RankingConfig;
use crate::error::{Error, Result};

/// Query request for the ask and retrieve endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,

    /// Number of re-ranked sources to return; `ranking.default_top_k` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
        }
    }

    /// Set the number of results to return
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Check the request and return the `top_k` to retrieve with
    pub fn validate(&self, ranking: &RankingConfig) -> Result<usize> {
        if self.query.trim().is_empty() {
            return Err(Error::validation("query must not be empty"));
        }
        let top_k = self.top_k.unwrap_or(ranking.default_top_k);
        if top_k == 0 || top_k > ranking.max_top_k {
            return Err(Error::validation(format!(
                "top_k must be between 1 and {}, got {}",
                ranking.max_top_k, top_k
            )));
        }
        Ok(top_k)
    }
}
