//! Agent configuration: defaults, environment overrides, optional TOML overlay.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::LlmClientConfig;
use crate::{Error, Result};

pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.88;
pub const DEFAULT_FACT_PROMPT: &str = "Find an interesting, fun, or quirky fact about chickens. \
Look for trivia, surprising behaviors, historical tidbits, or amusing chicken stories rather than \
scientific research papers. Cite your sources. Stay on topic about chickens. Only return one fact.";

/// Strip whitespace, a trailing `/` and a trailing `/api` from a base URL
pub fn sanitize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    trimmed.to_string()
}

/// Breed research workflow settings
#[derive(Clone, Debug, PartialEq)]
pub struct BreedResearchSettings {
    pub enabled: bool,
    pub max_tool_calls: u32,
    pub interval_secs: u64,
}

impl Default for BreedResearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tool_calls: 8,
            interval_secs: 86_400,
        }
    }
}

/// Chicken facts workflow settings
#[derive(Clone, Debug, PartialEq)]
pub struct FactSettings {
    pub enabled: bool,
    pub max_tool_calls: u32,
    pub max_duplicate_retries: u32,
    pub dedup_threshold: f64,
    pub interval_secs: u64,
    pub prompt: String,
}

impl Default for FactSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tool_calls: 4,
            max_duplicate_retries: 3,
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD,
            interval_secs: 86_400,
            prompt: DEFAULT_FACT_PROMPT.to_string(),
        }
    }
}

/// High-level configuration for the research agents
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    pub llm: LlmClientConfig,
    pub embedding_model: String,
    /// Default result count for web_search; always clamped to 1..=5
    pub web_search_max_results: u32,
    /// Compress search results and fetched pages with one-shot model calls
    pub web_summaries: bool,
    pub breed_research: BreedResearchSettings,
    pub facts: FactSettings,
    /// Optional JSON file seeding the breed catalog
    pub breeds_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            llm: LlmClientConfig::default(),
            embedding_model: std::env::var("OLLAMA_EMBEDDING_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "nomic-embed-text".to_string()),
            web_search_max_results: 3,
            web_summaries: true,
            breed_research: BreedResearchSettings::default(),
            facts: FactSettings::default(),
            breeds_path: None,
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file (path via HENHOUSE_CONFIG or ./henhouse.toml),
    /// overlaying values onto defaults and env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("HENHOUSE_CONFIG").unwrap_or_else(|_| "henhouse.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "config", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<AgentToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    /// Overlay a TOML document onto the defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let t = toml::from_str::<AgentToml>(s).map_err(|e| Error::Config(e.to_string()))?;
        Ok(t.overlay(Self::default()))
    }

    /// The API key, or `ClientUnavailable` when it is missing
    pub fn require_api_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::ClientUnavailable("OLLAMA_API_KEY is not set; agents will be skipped".into())
            })
    }

    pub fn breed_research_status(&self) -> AgentStatus {
        AgentStatus::evaluate("Breed research agent", self.breed_research.enabled, self)
    }

    pub fn facts_status(&self) -> AgentStatus {
        AgentStatus::evaluate("Chicken facts agent", self.facts.enabled, self)
    }
}

/// Readiness report for web-facing read paths
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentStatus {
    pub ready: bool,
    pub status: String,
    pub message: String,
}

impl AgentStatus {
    pub fn operational(agent_name: &str) -> Self {
        Self {
            ready: true,
            status: "operational".into(),
            message: format!("{agent_name} is ready"),
        }
    }

    pub fn unavailable(agent_name: &str) -> Self {
        Self {
            ready: false,
            status: "unavailable".into(),
            message: format!("{agent_name} is not configured. Check API key."),
        }
    }

    pub fn disabled(agent_name: &str) -> Self {
        Self {
            ready: false,
            status: "disabled".into(),
            message: format!("{agent_name} is disabled via configuration."),
        }
    }

    fn evaluate(agent_name: &str, enabled: bool, cfg: &AgentConfig) -> Self {
        if !enabled {
            Self::disabled(agent_name)
        } else if cfg.require_api_key().is_ok() {
            Self::operational(agent_name)
        } else {
            Self::unavailable(agent_name)
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, Deserialize)]
struct AgentToml {
    pub llm: Option<LlmToml>,
    pub embedding: Option<EmbeddingToml>,
    pub web: Option<WebToml>,
    pub breed_research: Option<BreedResearchToml>,
    pub facts: Option<FactsToml>,
    pub data: Option<DataToml>,
}

impl AgentToml {
    fn overlay(self, mut base: AgentConfig) -> AgentConfig {
        if let Some(l) = self.llm {
            l.apply(&mut base.llm);
        }
        if let Some(model) = self.embedding.and_then(|e| e.model) {
            base.embedding_model = model;
        }
        if let Some(w) = self.web {
            if let Some(v) = w.search_max_results {
                base.web_search_max_results = v.clamp(1, 5);
            }
            if let Some(v) = w.summarize_results {
                base.web_summaries = v;
            }
        }
        if let Some(b) = self.breed_research {
            b.apply(&mut base.breed_research);
        }
        if let Some(f) = self.facts {
            f.apply(&mut base.facts);
        }
        if let Some(path) = self.data.and_then(|d| d.breeds_path) {
            base.breeds_path = Some(path);
        }
        base
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LlmToml {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub temperature: Option<f32>,
}
impl LlmToml {
    fn apply(self, l: &mut LlmClientConfig) {
        if let Some(v) = self.base_url {
            l.base_url = sanitize_base_url(&v);
        }
        if let Some(v) = self.model {
            l.model = v;
        }
        if let Some(v) = self.api_key.filter(|k| !k.trim().is_empty()) {
            l.api_key = Some(v);
        }
        if let Some(v) = self.request_timeout_ms {
            l.request_timeout_ms = Some(v);
        }
        if let Some(v) = self.temperature {
            l.temperature = v;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddingToml {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WebToml {
    pub search_max_results: Option<u32>,
    pub summarize_results: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct BreedResearchToml {
    pub enabled: Option<bool>,
    pub max_tool_calls: Option<u32>,
    pub interval_secs: Option<u64>,
}
impl BreedResearchToml {
    fn apply(self, b: &mut BreedResearchSettings) {
        if let Some(v) = self.enabled {
            b.enabled = v;
        }
        if let Some(v) = self.max_tool_calls {
            b.max_tool_calls = v;
        }
        if let Some(v) = self.interval_secs {
            b.interval_secs = v.max(1);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FactsToml {
    pub enabled: Option<bool>,
    pub max_tool_calls: Option<u32>,
    pub max_duplicate_retries: Option<u32>,
    pub dedup_threshold: Option<f64>,
    pub interval_secs: Option<u64>,
    pub prompt: Option<String>,
}
impl FactsToml {
    fn apply(self, f: &mut FactSettings) {
        if let Some(v) = self.enabled {
            f.enabled = v;
        }
        if let Some(v) = self.max_tool_calls {
            f.max_tool_calls = v;
        }
        if let Some(v) = self.max_duplicate_retries {
            f.max_duplicate_retries = v;
        }
        if let Some(v) = self.dedup_threshold {
            f.dedup_threshold = v;
        }
        if let Some(v) = self.interval_secs {
            f.interval_secs = v.max(1);
        }
        if let Some(v) = self.prompt.filter(|p| !p.trim().is_empty()) {
            f.prompt = v;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DataToml {
    pub breeds_path: Option<PathBuf>,
}
