//! Web search and fetch against the Ollama web API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{ToolError, ToolResult};

/// Search result item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A fetched page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FetchedPage {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    url: &'a str,
}

/// Clamp a requested result count into 1..=5, falling back to the default
pub fn clamp_max_results(requested: Option<u32>, default_max: u32) -> u32 {
    requested.unwrap_or(default_max).clamp(1, 5)
}

/// Backend for the `web_search` and `web_fetch` tools
#[async_trait]
pub trait WebBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> ToolResult<Vec<SearchHit>>;
    async fn fetch(&self, url: &str) -> ToolResult<FetchedPage>;
}

/// HTTP client for `POST {base}/api/web_search` and `POST {base}/api/web_fetch`
#[derive(Clone)]
pub struct OllamaWebClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OllamaWebClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn post(&self, tool: &str, path: &str, body: &impl Serialize) -> ToolResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(target: "web_tools", tool, url = %url, "POST");

        let mut req = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| {
            tracing::error!(target: "web_tools", tool, error = %e, "Request failed");
            if e.is_connect() {
                ToolError::ExecutionFailed(format!("{tool} connection failed: {e}"))
            } else {
                ToolError::ExecutionFailed(format!("{tool} request failed: {e}"))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(target: "web_tools", tool, %status, "Web API returned non-success");
            return Err(ToolError::ExecutionFailed(format!(
                "{tool} failed with status {status} {body}"
            )));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("{tool} returned invalid JSON: {e}")))
    }
}

#[async_trait]
impl WebBackend for OllamaWebClient {
    async fn search(&self, query: &str, max_results: u32) -> ToolResult<Vec<SearchHit>> {
        info!(target: "web_tools", query = %query, max_results, "Executing web_search");
        let raw = self
            .post(
                "web_search",
                "/api/web_search",
                &SearchRequest { query, max_results },
            )
            .await?;
        let parsed: SearchResponse = serde_json::from_value(raw).map_err(|e| {
            ToolError::ExecutionFailed(format!("web_search returned unexpected payload: {e}"))
        })?;
        info!(target: "web_tools", count = parsed.results.len(), "web_search returned results");
        Ok(parsed.results)
    }

    async fn fetch(&self, url: &str) -> ToolResult<FetchedPage> {
        info!(target: "web_tools", url = %url, "Executing web_fetch");
        let raw = self
            .post("web_fetch", "/api/web_fetch", &FetchRequest { url })
            .await?;
        serde_json::from_value(raw).map_err(|e| {
            ToolError::ExecutionFailed(format!("web_fetch returned unexpected payload: {e}"))
        })
    }
}
