//! Feedback-aware retrieval: embed, over-fetch, re-rank

use std::sync::Arc;
use std::time::Duration;

use super::rerank::rerank;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::learning::BanditScorer;
use crate::providers::{EmbeddingProvider, VectorSearchProvider};
use crate::types::Candidate;

/// Retriever that re-ranks vector search hits with the bandit
#[derive(Clone)]
pub struct FeedbackAwareRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_search: Arc<dyn VectorSearchProvider>,
    bandit: Arc<BanditScorer>,
    overfetch_factor: usize,
    embed_timeout: Duration,
    search_timeout: Duration,
}

impl FeedbackAwareRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_search: Arc<dyn VectorSearchProvider>,
        bandit: Arc<BanditScorer>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            vector_search,
            bandit,
            overfetch_factor: config.ranking.overfetch_factor.max(1),
            embed_timeout: config.llm.embed_timeout(),
            search_timeout: config.vector_search.timeout(),
        }
    }

    /// Return the `top_k` best candidates for `query`.
    ///
    /// Fetches `top_k * overfetch_factor` hits so a well-rewarded document just
    /// outside the similarity cutoff can still make the final list. Any
    /// embedding or search failure fails the whole call.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
        let embedding = tokio::time::timeout(self.embed_timeout, self.embedder.embed(query))
            .await
            .map_err(|_| Error::timeout("query embedding", self.embed_timeout))??;

        let limit = top_k.saturating_mul(self.overfetch_factor);
        let hits = tokio::time::timeout(
            self.search_timeout,
            self.vector_search.search(&embedding, limit),
        )
        .await
        .map_err(|_| Error::timeout("vector search", self.search_timeout))??;

        tracing::info!(
            "{} returned {} of {} requested candidates",
            self.vector_search.name(),
            hits.len(),
            limit
        );

        let candidates = hits.into_iter().map(Candidate::from_hit).collect();
        Ok(rerank(candidates, &self.bandit, top_k))
    }

    pub fn bandit(&self) -> &Arc<BanditScorer> {
        &self.bandit
    }
}
