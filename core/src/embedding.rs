use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dedup::EmbeddingProvider;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f64>,
}

/// Client for `POST {base}/api/embeddings`
#[derive(Clone)]
pub struct OllamaEmbeddingClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OllamaEmbeddingClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Option<Vec<f64>>> {
        let url = format!("{}/api/embeddings", self.base_url);
        debug!(target: "embedding", model = %self.model, chars = text.len(), "POST {}", url);

        let mut req = self.http.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            prompt: text,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("Embedding HTTP error: {e}")))?;

        if !resp.status().is_success() {
            warn!(target: "embedding", status = %resp.status(), "Embedding request failed");
            return Ok(None);
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("Invalid embedding JSON: {e}")))?;
        if parsed.embedding.is_empty() {
            warn!(target: "embedding", "Embedding response returned empty vector");
            return Ok(None);
        }
        Ok(Some(parsed.embedding))
    }
}
