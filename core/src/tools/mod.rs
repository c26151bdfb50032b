pub mod breed;
pub mod error;
pub mod facts;
pub mod registry;
pub mod summarizer;
pub mod web;

// Re-export common types
pub use error::{ToolError, ToolResult};
pub use registry::{BreedResearchArgs, FactArgs, ToolKind, ToolRequest};
pub use summarizer::Summarizer;
pub use web::{FetchedPage, OllamaWebClient, SearchHit, WebBackend};

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::store::BreedCatalog;

/// Result of one tool execution
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text appended to the transcript as the tool-result turn
    pub content: String,
    /// Set when a completion tool accepted its payload; ends the model loop
    pub completion: Option<Value>,
}

impl ToolOutput {
    fn text(content: String) -> Self {
        Self {
            content,
            completion: None,
        }
    }

    fn json(value: &Value) -> Self {
        Self::text(value.to_string())
    }
}

/// Executes typed tool requests against the run's collaborators
#[derive(Clone)]
pub struct Toolbox {
    web: Arc<dyn WebBackend>,
    summarizer: Summarizer,
    catalog: Option<Arc<dyn BreedCatalog>>,
    search_max_results: u32,
}

impl Toolbox {
    pub fn new(web: Arc<dyn WebBackend>, summarizer: Summarizer) -> Self {
        Self {
            web,
            summarizer,
            catalog: None,
            search_max_results: 3,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn BreedCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_search_max_results(mut self, max_results: u32) -> Self {
        self.search_max_results = max_results;
        self
    }

    fn catalog(&self) -> ToolResult<&dyn BreedCatalog> {
        self.catalog
            .as_deref()
            .ok_or_else(|| ToolError::Unavailable("breed catalog not configured".into()))
    }

    pub async fn execute(&self, request: ToolRequest) -> ToolResult<ToolOutput> {
        debug!(target: "web_tools", tool = request.kind().name(), "Executing tool");
        match request {
            ToolRequest::WebSearch { query, max_results } => {
                let n = web::clamp_max_results(max_results, self.search_max_results);
                let hits = self.web.search(&query, n).await?;
                Ok(ToolOutput::text(
                    self.summarizer.summarize_search(&query, &hits).await,
                ))
            }
            ToolRequest::WebFetch { url } => {
                let page = self.web.fetch(&url).await?;
                Ok(ToolOutput::text(
                    self.summarizer.summarize_page(&url, &page).await,
                ))
            }
            ToolRequest::NextBreed => Ok(ToolOutput::json(&breed::next_breed(self.catalog()?).await?)),
            ToolRequest::BreedDetails { breed_id } => Ok(ToolOutput::json(
                &breed::breed_details(self.catalog()?, breed_id).await?,
            )),
            ToolRequest::SaveBreedResearch(args) => {
                let (echo, accepted) = breed::save_breed_research(self.catalog()?, args).await?;
                Ok(completion(echo, accepted))
            }
            ToolRequest::SaveChickenFact(args) => {
                let (echo, accepted) = facts::save_chicken_fact(args);
                Ok(completion(echo, accepted))
            }
        }
    }
}

fn completion(echo: Value, accepted: bool) -> ToolOutput {
    ToolOutput {
        content: echo.to_string(),
        completion: accepted.then_some(echo),
    }
}
