use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::sanitize_base_url;
use crate::{Error, Result};

use super::adapter::{extract_text_from_chat, parse_reply, tools_to_chat, transcript_to_messages};
use super::model::{ChatModel, ModelReply, ToolSpec, Turn};

/// Configuration for LlmClient loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct LlmClientConfig {
    pub base_url: String, // e.g., https://ollama.com
    pub model: String,    // e.g., gpt-oss:120b
    pub api_key: Option<String>,
    /// No timeout unless configured; callers bound whole runs instead
    pub request_timeout_ms: Option<u64>,
    pub temperature: f32,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("OLLAMA_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| sanitize_base_url(&s))
                .unwrap_or_else(|| "https://ollama.com".to_string()),
            model: std::env::var("OLLAMA_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "gpt-oss:120b".to_string()),
            api_key: std::env::var("OLLAMA_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            request_timeout_ms: std::env::var("LLM_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.7),
        }
    }
}

/// HTTP client for an OpenAI-compatible Chat Completions endpoint
#[derive(Clone)]
pub struct LlmClient {
    pub(crate) http: Client,
    pub(crate) cfg: LlmClientConfig,
}

impl LlmClient {
    pub fn new(cfg: LlmClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder
            .build()
            .map_err(|e| Error::ClientUnavailable(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, cfg })
    }

    /// Reuse an HTTP client owned by the surrounding service
    pub fn with_http(http: Client, cfg: LlmClientConfig) -> Self {
        Self { http, cfg }
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LlmClientConfig::default())
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.cfg
    }

    async fn post_chat(&self, body: Value) -> Result<Value> {
        let url = format!("{}/v1/chat/completions", self.cfg.base_url);
        debug!(target: "llm_client", "POST {} via Chat Completions", url);

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }
        // Applies to shared clients handed in through `with_http` as well
        if let Some(ms) = self.cfg.request_timeout_ms {
            req = req.timeout(Duration::from_millis(ms));
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("Chat Completions HTTP error: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target: "llm_client", %status, body = %text, "Chat Completions error");
            return Err(Error::Model(format!(
                "Chat Completions error: status={} body={}",
                status, text
            )));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| Error::Model(format!("Failed to parse Chat Completions JSON: {e}")))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn respond(&self, transcript: &[Turn], tools: &[ToolSpec]) -> Result<ModelReply> {
        let mut body = json!({
            "model": self.cfg.model,
            "messages": transcript_to_messages(transcript),
            "temperature": self.cfg.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools_to_chat(tools));
            body["tool_choice"] = json!("auto");
        }
        let val = self.post_chat(body).await?;
        parse_reply(&val).ok_or_else(|| {
            Error::Model("Missing choices[0].message content and tool calls".into())
        })
    }

    async fn respond_without_tools(&self, transcript: &[Turn]) -> Result<String> {
        let body = json!({
            "model": self.cfg.model,
            "messages": transcript_to_messages(transcript),
            "temperature": self.cfg.temperature,
        });
        let val = self.post_chat(body).await?;
        // A blank answer is still an answer; the validator decides what it is worth
        Ok(extract_text_from_chat(&val).unwrap_or_default())
    }
}
