//! Provider abstractions for embeddings, answer generation, and vector search
//!
//! The re-ranking pipeline only sees these traits; Ollama and the RPC vector
//! search are the bundled implementations.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod rpc;
pub mod vector_search;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{ollama_providers, OllamaClient, OllamaEmbedder, OllamaLlm};
pub use rpc::RpcVectorSearch;
pub use vector_search::{SearchHit, VectorSearchProvider};
