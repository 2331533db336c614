//! Vector search over a PostgREST-style RPC endpoint
//!
//! Posts `{query_embedding, match_count, filter}` to
//! `<base_url>/rest/v1/rpc/<match_function>` and expects an array of
//! `{content, metadata, similarity}` rows.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::VectorSearchConfig;
use crate::error::{Error, Result};

use super::vector_search::{SearchHit, VectorSearchProvider};

/// `match_documents`-style RPC client
pub struct RpcVectorSearch {
    client: Client,
    config: VectorSearchConfig,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
    filter: Map<String, Value>,
}

impl RpcVectorSearch {
    pub fn new(config: &VectorSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn rpc_url(&self) -> String {
        format!(
            "{}/rest/v1/rpc/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.match_function
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl VectorSearchProvider for RpcVectorSearch {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let body = MatchRequest {
            query_embedding,
            match_count: limit,
            filter: Map::new(),
        };

        let response = self
            .authorize(self.client.post(self.rpc_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::vector_search(format!("RPC request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_search(format!(
                "{} failed: HTTP {} - {}",
                self.config.match_function, status, body
            )));
        }

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| Error::vector_search(format!("Failed to parse RPC response: {}", e)))?;

        tracing::debug!("{} returned {} hits", self.config.match_function, hits.len());
        Ok(hits)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/rest/v1/", self.config.base_url.trim_end_matches('/'));

        match self.authorize(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "rpc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_url() {
        let config = VectorSearchConfig {
            base_url: "https://db.example/".to_string(),
            match_function: "match_chunks".to_string(),
            ..VectorSearchConfig::default()
        };
        let search = RpcVectorSearch::new(&config).unwrap();
        assert_eq!(search.rpc_url(), "https://db.example/rest/v1/rpc/match_chunks");
    }

    #[test]
    fn test_request_body_shape() {
        let embedding = [0.5f32, -0.25];
        let body = serde_json::to_value(MatchRequest {
            query_embedding: &embedding,
            match_count: 10,
            filter: Map::new(),
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"query_embedding": [0.5, -0.25], "match_count": 10, "filter": {}})
        );
    }
}
