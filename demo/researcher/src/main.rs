use henhouse_core::embedding::OllamaEmbeddingClient;
use henhouse_core::store::{InMemoryBreedCatalog, InMemoryFactLog, InMemoryResearchLog};
use henhouse_core::tools::{OllamaWebClient, WebBackend};
use henhouse_core::{
    telemetry, AgentConfig, BreedResearchRunner, ChatModel, FactResearchRunner, LlmClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    telemetry::init(telemetry::DEFAULT_FILTER);

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = AgentConfig::load();
    info!(
        target: "researcher",
        model = %cfg.llm.model,
        base_url = %cfg.llm.base_url,
        "Starting researcher: breed research + chicken facts"
    );

    for status in [cfg.breed_research_status(), cfg.facts_status()] {
        info!(target: "researcher", status = %serde_json::to_string(&status)?, "Agent status");
    }
    if let Err(e) = cfg.require_api_key() {
        warn!(target: "researcher", error = %e, "Runs will be skipped until an API key is configured");
    }

    // One pooled HTTP client for model, web tools and embeddings
    let http = reqwest::Client::new();
    let model: Arc<dyn ChatModel> = Arc::new(LlmClient::with_http(http.clone(), cfg.llm.clone()));
    let web: Arc<dyn WebBackend> = Arc::new(OllamaWebClient::new(
        http.clone(),
        cfg.llm.base_url.clone(),
        cfg.llm.api_key.clone(),
    ));
    let embedder = Arc::new(OllamaEmbeddingClient::new(
        http,
        cfg.llm.base_url.clone(),
        cfg.embedding_model.clone(),
        cfg.llm.api_key.clone(),
    ));

    let catalog = match &cfg.breeds_path {
        Some(path) => InMemoryBreedCatalog::from_json_file(path)?,
        None => {
            warn!(target: "researcher", "No breed seed configured; breed research will find no breeds");
            InMemoryBreedCatalog::new()
        }
    };

    let breed_runner = Arc::new(BreedResearchRunner::new(
        &cfg,
        model.clone(),
        web.clone(),
        Arc::new(catalog),
        Arc::new(InMemoryResearchLog::new()),
    ));
    let fact_runner = Arc::new(FactResearchRunner::new(
        &cfg,
        model,
        web,
        embedder,
        Arc::new(InMemoryFactLog::new()),
    ));

    // Each workflow serialises its own runs; the two loops may overlap
    let breed_task = tokio::spawn(
        breed_runner.run_every(Duration::from_secs(cfg.breed_research.interval_secs)),
    );
    let fact_task = tokio::spawn(
        fact_runner.run_every(Duration::from_secs(cfg.facts.interval_secs)),
    );

    if let Err(e) = signal::ctrl_c().await {
        error!(target: "researcher", error = %e, "Failed to listen for Ctrl-C");
    }
    info!(target: "researcher", "Shutting down");
    breed_task.abort();
    fact_task.abort();
    Ok(())
}
