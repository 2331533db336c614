//! Application state for the RAG server

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::learning::{BanditScorer, FeedbackService, WarmStart, WarmStartLoader};
use crate::providers::{
    ollama_providers, EmbeddingProvider, LlmProvider, RpcVectorSearch, VectorSearchProvider,
};
use crate::retrieval::FeedbackAwareRetriever;
use crate::storage::{RewardLedger, SqliteLedger, UnavailableLedger};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Embedding provider
    embedding_provider: Arc<dyn EmbeddingProvider>,
    /// Vector search provider
    vector_search: Arc<dyn VectorSearchProvider>,
    /// LLM provider
    llm_provider: Arc<dyn LlmProvider>,
    /// Reward ledger
    ledger: Arc<dyn RewardLedger>,
    /// Bandit shared by the retriever and the feedback service
    bandit: Arc<BanditScorer>,
    /// Embed, search, re-rank
    retriever: FeedbackAwareRetriever,
    /// Feedback write path
    feedback: FeedbackService,
    /// Outcome of the first warm start; set once the replay has finished
    warm_start: OnceCell<WarmStart>,
}

impl AppState {
    /// Create the state from configuration and load feedback history.
    ///
    /// A ledger that cannot be opened is replaced by `UnavailableLedger`: the
    /// service still answers queries, with a zero bandit contribution.
    pub async fn new(config: RagConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("Initializing RAG application state...");

        let (embedder, llm) = ollama_providers(&config.llm)?;
        tracing::info!(
            "Ollama providers initialized (embed: {}, generate: {})",
            config.llm.embed_model,
            config.llm.generate_model
        );

        let vector_search = RpcVectorSearch::new(&config.vector_search)?;
        tracing::info!(
            "Vector search initialized ({}/rest/v1/rpc/{})",
            config.vector_search.base_url,
            config.vector_search.match_function
        );

        let ledger: Arc<dyn RewardLedger> = match SqliteLedger::open(&config.ledger.path) {
            Ok(ledger) => {
                tracing::info!("Reward ledger opened at {}", config.ledger.path.display());
                Arc::new(ledger)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not open reward ledger at {}: {}",
                    config.ledger.path.display(),
                    e
                );
                Arc::new(UnavailableLedger::new(e.to_string()))
            }
        };

        let state = Self::from_parts(
            config,
            Arc::new(embedder),
            Arc::new(vector_search),
            Arc::new(llm),
            ledger,
        );
        state.warm_start().await;
        Ok(state)
    }

    /// Assemble the state from already-built collaborators.
    ///
    /// The state is not ready until `warm_start` has run.
    pub fn from_parts(
        config: RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_search: Arc<dyn VectorSearchProvider>,
        llm_provider: Arc<dyn LlmProvider>,
        ledger: Arc<dyn RewardLedger>,
    ) -> Self {
        let bandit = Arc::new(BanditScorer::new());
        let retriever = FeedbackAwareRetriever::new(
            Arc::clone(&embedding_provider),
            Arc::clone(&vector_search),
            Arc::clone(&bandit),
            &config,
        );
        let feedback = FeedbackService::new(
            Arc::clone(&bandit),
            Arc::clone(&ledger),
            config.ledger.append_timeout(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                embedding_provider,
                vector_search,
                llm_provider,
                ledger,
                bandit,
                retriever,
                feedback,
                warm_start: OnceCell::new(),
            }),
        }
    }

    /// Replay the ledger into the bandit and mark the state ready.
    ///
    /// Only the first call replays. Calls that overlap it wait until the
    /// replay has finished, then return `AlreadyLoaded`, so the state never
    /// reports ready while history is still being read.
    pub async fn warm_start(&self) -> WarmStart {
        let mut replayed = false;
        let outcome = self
            .inner
            .warm_start
            .get_or_init(|| {
                replayed = true;
                let loader = WarmStartLoader::new(
                    self.inner.ledger.as_ref(),
                    self.inner.config.ledger.page_size,
                );
                async move { loader.warm_start(&self.inner.bandit).await }
            })
            .await;

        if replayed {
            outcome.clone()
        } else {
            tracing::warn!("Warm start already ran; skipping ledger replay");
            WarmStart::AlreadyLoaded
        }
    }

    /// Fail with `NotReady` until the warm start has run
    pub fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady("feedback history is still loading".to_string()))
        }
    }

    /// Check if server is ready
    pub fn is_ready(&self) -> bool {
        self.inner.warm_start.initialized()
    }

    /// First warm start outcome, if any
    pub fn warm_start_outcome(&self) -> Option<WarmStart> {
        self.inner.warm_start.get().cloned()
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get embedding provider
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedding_provider
    }

    /// Get vector search provider
    pub fn vector_search(&self) -> &Arc<dyn VectorSearchProvider> {
        &self.inner.vector_search
    }

    /// Get LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }

    /// Get reward ledger
    pub fn ledger(&self) -> &Arc<dyn RewardLedger> {
        &self.inner.ledger
    }

    /// Get bandit scorer
    pub fn bandit(&self) -> &Arc<BanditScorer> {
        &self.inner.bandit
    }

    /// Get retriever
    pub fn retriever(&self) -> &FeedbackAwareRetriever {
        &self.inner.retriever
    }

    /// Get feedback service
    pub fn feedback(&self) -> &FeedbackService {
        &self.inner.feedback
    }
}
