//! Configuration for the feedback-aware RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "FEEDBACK_RAG_";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Ollama/LLM configuration (embeddings and generation)
    pub llm: LlmConfig,
    /// External vector search configuration
    pub vector_search: VectorSearchConfig,
    /// Reward ledger configuration
    pub ledger: LedgerConfig,
    /// Re-ranking configuration
    pub ranking: RankingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file. Missing sections use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: RagConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Apply `FEEDBACK_RAG_*` environment overrides
    pub fn apply_env(mut self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {}PORT: {}", ENV_PREFIX, e)))?;
        }
        if let Some(origin) = lookup("FRONTEND_ORIGIN") {
            self.server.frontend_origin = Some(origin);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("EMBED_MODEL") {
            self.llm.embed_model = model;
        }
        if let Some(model) = lookup("GENERATE_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(url) = lookup("VECTOR_SEARCH_URL") {
            self.vector_search.base_url = url;
        }
        if let Some(key) = lookup("VECTOR_SEARCH_KEY") {
            self.vector_search.api_key = Some(key);
        }
        if let Some(function) = lookup("MATCH_FUNCTION") {
            self.vector_search.match_function = function;
        }
        if let Some(path) = lookup("LEDGER_PATH") {
            self.ledger.path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Reject values that would make the service misbehave
    pub fn validate(&self) -> Result<()> {
        if self.ledger.page_size == 0 {
            return Err(Error::Config("ledger.page_size must be at least 1".to_string()));
        }
        if self.ranking.max_top_k == 0 {
            return Err(Error::Config("ranking.max_top_k must be at least 1".to_string()));
        }
        if self.ranking.default_top_k == 0 || self.ranking.default_top_k > self.ranking.max_top_k {
            return Err(Error::Config(format!(
                "ranking.default_top_k must be within 1..={}",
                self.ranking.max_top_k
            )));
        }
        if self.ranking.overfetch_factor == 0 {
            return Err(Error::Config(
                "ranking.overfetch_factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed CORS origin for the frontend (any origin when unset)
    pub frontend_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_origin: None,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Deadline for embedding one query, retries included, in milliseconds
    pub embed_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "all-minilm".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
            embed_timeout_ms: 30_000,
        }
    }
}

impl LlmConfig {
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }
}

/// External vector search (PostgREST-style RPC) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchConfig {
    /// Base URL of the REST endpoint
    pub base_url: String,
    /// API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Name of the similarity-match RPC function
    pub match_function: String,
    /// Timeout for a single search call in milliseconds
    pub timeout_ms: u64,
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: None,
            match_function: "match_documents".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl VectorSearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Reward ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// SQLite database path
    pub path: PathBuf,
    /// Rows per page during warm start
    pub page_size: usize,
    /// Timeout for one append in milliseconds
    pub append_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedback-rag")
            .join("feedback.db");

        Self {
            path,
            page_size: 1000,
            append_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }
}

/// Re-ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Results returned when the request does not say
    pub default_top_k: usize,
    /// Upper bound accepted for `top_k`
    pub max_top_k: usize,
    /// Candidates requested from the vector store per returned result
    pub overfetch_factor: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 20,
            overfetch_factor: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ranking.overfetch_factor, 2);
        assert_eq!(config.ledger.page_size, 1000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [ledger]
            page_size = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ledger.page_size, 50);
        assert_eq!(config.ranking.max_top_k, 20);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag.toml");
        std::fs::write(&path, "[vector_search]\nmatch_function = \"match_chunks\"\n").unwrap();

        let config = RagConfig::load(&path).unwrap();
        assert_eq!(config.vector_search.match_function, "match_chunks");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "7000"),
            ("LEDGER_PATH", "/tmp/ledger.db"),
            ("VECTOR_SEARCH_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.ledger.path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.vector_search.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = RagConfig::default();
        let result = config.apply_overrides(|key| (key == "PORT").then(|| "abc".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = RagConfig::default();
        config.ledger.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_default_above_max() {
        let mut config = RagConfig::default();
        config.ranking.default_top_k = 25;
        assert!(config.validate().is_err());
    }
}
