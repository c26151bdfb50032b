//! Run completion: one fresh engine per run, outcome classification, and
//! persistence of the run record. Also the fixed-interval loop that drives it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{AgentConfig, AgentStatus};
use crate::dedup::{DuplicateCheck, DuplicateDetector, EmbeddingProvider};
use crate::engine::ConversationEngine;
use crate::extract::extract_payload;
use crate::llm::ChatModel;
use crate::records::{Breed, BreedResearchRecord, FactRecord, RunOutcome};
use crate::store::{BreedCatalog, FactLog, ResearchLog};
use crate::tools::{Summarizer, Toolbox, WebBackend};
use crate::validate::{first_url, is_bullet_line};
use crate::workflow::{Workflow, BREED_SENTINEL, FACT_SENTINEL};

/// Run `job` every `period` until the task is dropped. The first run starts
/// immediately; ticks missed while a run is in progress are skipped.
pub async fn run_every<F, Fut>(name: &'static str, period: Duration, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(target: "runner", workflow = name, period_secs = period.as_secs(), "Scheduler started");
    loop {
        ticker.tick().await;
        info!(target: "runner", workflow = name, "Scheduled task started");
        job().await;
        info!(target: "runner", workflow = name, "Scheduled task completed");
    }
}

fn toolbox(
    model: &Arc<dyn ChatModel>,
    web: &Arc<dyn WebBackend>,
    workflow: &Workflow,
    summaries: bool,
    search_max_results: u32,
) -> Toolbox {
    let summarizer = if summaries {
        Summarizer::new(model.clone(), workflow.search_focus, workflow.fetch_focus)
    } else {
        Summarizer::passthrough()
    };
    Toolbox::new(web.clone(), summarizer).with_search_max_results(search_max_results)
}

fn millis_between(start: Instant) -> i64 {
    i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// Payload the breed workflow is expected to end with
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreedPayload {
    #[serde(default)]
    success: Option<bool>,
    breed_id: i64,
    #[serde(default)]
    report: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    egg_color: Option<String>,
    #[serde(default)]
    egg_size: Option<String>,
    #[serde(default)]
    temperament: Option<String>,
    #[serde(default)]
    num_eggs: Option<i64>,
    #[serde(default)]
    sources: Vec<String>,
}

/// Apply verified fields onto `breed`, returning the names of changed fields
fn apply_research(breed: &mut Breed, payload: &BreedPayload, now: DateTime<Utc>) -> Vec<String> {
    let mut updated = Vec::new();

    fn set<T: PartialEq + Clone>(slot: &mut Option<T>, value: &Option<T>, name: &str, updated: &mut Vec<String>) {
        if let Some(v) = value {
            if slot.as_ref() != Some(v) {
                updated.push(name.to_string());
            }
            *slot = Some(v.clone());
        }
    }

    set(&mut breed.origin, &payload.origin, "origin", &mut updated);
    set(&mut breed.egg_color, &payload.egg_color, "eggColor", &mut updated);
    set(&mut breed.egg_size, &payload.egg_size, "eggSize", &mut updated);
    set(&mut breed.temperament, &payload.temperament, "temperament", &mut updated);
    set(&mut breed.description, &payload.description, "description", &mut updated);
    set(&mut breed.num_eggs, &payload.num_eggs, "numEggs", &mut updated);
    if !payload.sources.is_empty() {
        breed.sources = payload.sources.clone();
        updated.push("sources".to_string());
    }
    breed.updated_at = Some(now);
    updated
}

/// Drives the breed research workflow
pub struct BreedResearchRunner {
    model: Arc<dyn ChatModel>,
    web: Arc<dyn WebBackend>,
    catalog: Arc<dyn BreedCatalog>,
    log: Arc<dyn ResearchLog>,
    status: AgentStatus,
    max_tool_calls: u32,
    search_max_results: u32,
    summaries: bool,
}

impl BreedResearchRunner {
    pub fn new(
        cfg: &AgentConfig,
        model: Arc<dyn ChatModel>,
        web: Arc<dyn WebBackend>,
        catalog: Arc<dyn BreedCatalog>,
        log: Arc<dyn ResearchLog>,
    ) -> Self {
        Self {
            model,
            web,
            catalog,
            log,
            status: cfg.breed_research_status(),
            max_tool_calls: cfg.breed_research.max_tool_calls,
            search_max_results: cfg.web_search_max_results,
            summaries: cfg.web_summaries,
        }
    }

    pub fn status(&self) -> &AgentStatus {
        &self.status
    }

    /// Run one research pass. `None` when the agent is not ready.
    #[tracing::instrument(name = "breed_research_run", skip_all)]
    pub async fn run_once(&self) -> Option<BreedResearchRecord> {
        if !self.status.ready {
            info!(target: "runner", status = %self.status.status, "Breed research agent is not ready, skipping run");
            return None;
        }

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let timer = Instant::now();

        let workflow = Workflow::breed_research(self.max_tool_calls);
        let toolbox = toolbox(&self.model, &self.web, &workflow, self.summaries, self.search_max_results)
            .with_catalog(self.catalog.clone());
        let result = ConversationEngine::new(self.model.clone(), toolbox, workflow)
            .run()
            .await;

        let mut record = BreedResearchRecord {
            run_id,
            breed_id: -1,
            breed_name: "UNKNOWN".to_string(),
            started_at,
            completed_at: started_at,
            duration_millis: 0,
            outcome: RunOutcome::Failed,
            report: None,
            sources_found: Vec::new(),
            fields_updated: Vec::new(),
            error_message: None,
        };

        match result {
            Err(e) => {
                error!(target: "runner", error = %e, "Breed research run failed");
                record.error_message = Some(e.to_string());
            }
            Ok(summary) => match extract_payload::<BreedPayload>(&summary.text, BREED_SENTINEL)
                .filter(|p| p.success != Some(false))
            {
                None => {
                    warn!(target: "runner", chars = summary.text.len(), "Breed research returned no usable output");
                    record.outcome = RunOutcome::NoOutput;
                }
                Some(payload) => self.apply(&mut record, payload).await,
            },
        }

        record.completed_at = Utc::now();
        record.duration_millis = millis_between(timer);
        if record.outcome != RunOutcome::Failed {
            record.error_message = None;
        }
        match record.outcome {
            RunOutcome::Success => info!(target: "runner", breed = %record.breed_name, "Breed research succeeded"),
            RunOutcome::NoOutput => warn!(target: "runner", "Breed research agent returned no output"),
            RunOutcome::Failed => error!(target: "runner", reason = ?record.error_message, "Breed research agent failed"),
        }

        if let Err(e) = self.log.append(record.clone()).await {
            error!(target: "runner", run_id = %record.run_id, error = %e, "Failed to persist breed research record");
        }
        Some(record)
    }

    async fn apply(&self, record: &mut BreedResearchRecord, payload: BreedPayload) {
        record.breed_id = payload.breed_id;
        record.report = payload.report.clone();
        record.sources_found = payload.sources.clone();

        let mut breed = match self.catalog.breed(payload.breed_id).await {
            Ok(Some(breed)) => breed,
            Ok(None) => {
                record.error_message = Some(format!("Breed not found: {}", payload.breed_id));
                return;
            }
            Err(e) => {
                record.error_message = Some(format!("Failed to load breed: {e}"));
                return;
            }
        };
        record.breed_name = breed.name.clone();

        let fields = apply_research(&mut breed, &payload, Utc::now());
        match self.catalog.update(breed).await {
            Ok(()) => {
                info!(target: "runner", breed = %record.breed_name, fields = ?fields, "Updated breed");
                record.fields_updated = fields;
                record.outcome = RunOutcome::Success;
            }
            Err(e) => {
                record.error_message = Some(format!("Failed to update breed: {e}"));
            }
        }
    }

    /// Run forever on the configured period
    pub async fn run_every(self: Arc<Self>, period: Duration) {
        run_every("breed_research", period, move || {
            let runner = self.clone();
            async move {
                runner.run_once().await;
            }
        })
        .await
    }
}

/// A fact and its source, as extracted from a final answer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFact {
    pub fact: String,
    #[serde(default, alias = "source_url")]
    pub source_url: Option<String>,
}

/// Pull a fact out of the final text: the JSON payload first, then the
/// first markdown bullet that carries a URL.
pub fn extract_fact(text: &str) -> Option<ExtractedFact> {
    if let Some(parsed) = extract_payload::<ExtractedFact>(text, FACT_SENTINEL) {
        if !parsed.fact.trim().is_empty() {
            return Some(ExtractedFact {
                fact: parsed.fact.trim().to_string(),
                source_url: parsed.source_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            });
        }
    }
    text.lines()
        .filter(|l| is_bullet_line(l))
        .find_map(bullet_fact)
}

fn bullet_fact(line: &str) -> Option<ExtractedFact> {
    let url = first_url(line)?;
    let body = line.trim_start();
    let body = body
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['-', '*', '•', '.'])
        .replace(url, "");
    // Peel trailing "(Source: )" style leftovers
    let mut fact = body.trim().to_string();
    loop {
        let before = fact.len();
        fact = fact
            .trim_end_matches([' ', ')', ']', '>', '(', '[', '<', '-', ':', '|', '–', '—'])
            .to_string();
        for label in ["Source", "source"] {
            if let Some(stripped) = fact.strip_suffix(label) {
                fact = stripped.to_string();
            }
        }
        if fact.len() == before {
            break;
        }
    }
    let fact = fact.trim().to_string();
    if fact.is_empty() {
        return None;
    }
    Some(ExtractedFact {
        fact,
        source_url: Some(url.to_string()),
    })
}

fn duplicate_feedback(check: &DuplicateCheck) -> String {
    let details = serde_json::to_string_pretty(check).unwrap_or_default();
    format!(
        "The proposed fact is too similar to an existing fact already in the database.\n\n\
         Duplicate check details:\n{details}\n\n\
         You must produce a genuinely different chicken fact.\n\
         - Do not paraphrase the same core claim.\n\
         - Choose a distinct topic, behavior, historical event, or trivia angle.\n\
         - You may continue researching with web_search/web_fetch if needed."
    )
}

enum FactOutcome {
    Saved {
        fact: ExtractedFact,
        embedding: Vec<f64>,
    },
    Nothing,
    Failed(String),
}

/// Drives the chicken fact workflow with duplicate detection
pub struct FactResearchRunner {
    model: Arc<dyn ChatModel>,
    web: Arc<dyn WebBackend>,
    facts: Arc<dyn FactLog>,
    detector: DuplicateDetector,
    status: AgentStatus,
    max_tool_calls: u32,
    max_duplicate_retries: u32,
    prompt: String,
    search_max_results: u32,
    summaries: bool,
}

impl FactResearchRunner {
    pub fn new(
        cfg: &AgentConfig,
        model: Arc<dyn ChatModel>,
        web: Arc<dyn WebBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        facts: Arc<dyn FactLog>,
    ) -> Self {
        Self {
            model,
            web,
            detector: DuplicateDetector::new(embedder, facts.clone(), cfg.facts.dedup_threshold),
            facts,
            status: cfg.facts_status(),
            max_tool_calls: cfg.facts.max_tool_calls,
            max_duplicate_retries: cfg.facts.max_duplicate_retries,
            prompt: cfg.facts.prompt.clone(),
            search_max_results: cfg.web_search_max_results,
            summaries: cfg.web_summaries,
        }
    }

    pub fn status(&self) -> &AgentStatus {
        &self.status
    }

    /// Run one fact pass, retrying with fresh engines on duplicates.
    /// `None` when the agent is not ready.
    #[tracing::instrument(name = "fact_research_run", skip_all)]
    pub async fn run_once(&self) -> Option<FactRecord> {
        if !self.status.ready {
            info!(target: "runner", status = %self.status.status, "Chicken facts agent is not ready, skipping run");
            return None;
        }

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let timer = Instant::now();

        let outcome = self.research().await;

        let mut record = FactRecord {
            run_id,
            started_at,
            completed_at: Utc::now(),
            duration_millis: millis_between(timer),
            outcome: RunOutcome::NoOutput,
            fact: None,
            source_url: None,
            fact_embedding: None,
            error_message: None,
        };
        match outcome {
            FactOutcome::Saved { fact, embedding } => {
                info!(target: "runner", source = ?fact.source_url, "Chicken facts agent produced a fact");
                record.outcome = RunOutcome::Success;
                record.fact = Some(fact.fact);
                record.source_url = fact.source_url;
                record.fact_embedding = Some(embedding);
            }
            FactOutcome::Nothing => {
                warn!(target: "runner", "Chicken facts agent returned no usable fact");
            }
            FactOutcome::Failed(reason) => {
                error!(target: "runner", %reason, "Chicken facts agent failed");
                record.outcome = RunOutcome::Failed;
                record.error_message = Some(reason);
            }
        }

        if let Err(e) = self.facts.append(record.clone()).await {
            error!(target: "runner", run_id = %record.run_id, error = %e, "Failed to persist chicken fact record");
        }
        Some(record)
    }

    async fn research(&self) -> FactOutcome {
        let mut feedback: Option<String> = None;
        let mut duplicates = 0u32;
        loop {
            let mut workflow = Workflow::chicken_facts(self.max_tool_calls, self.prompt.clone());
            if let Some(text) = &feedback {
                workflow = workflow.with_feedback(text);
            }
            let toolbox = toolbox(&self.model, &self.web, &workflow, self.summaries, self.search_max_results);
            let summary = match ConversationEngine::new(self.model.clone(), toolbox, workflow)
                .run()
                .await
            {
                Ok(summary) => summary,
                Err(e) => return FactOutcome::Failed(e.to_string()),
            };

            let Some(fact) = extract_fact(&summary.text) else {
                return FactOutcome::Nothing;
            };
            let check = match self.detector.check(&fact.fact).await {
                Ok(check) => check,
                Err(e) => return FactOutcome::Failed(e.to_string()),
            };
            if !check.has_hit {
                return FactOutcome::Saved {
                    fact,
                    embedding: check.candidate_embedding,
                };
            }

            duplicates += 1;
            if duplicates > self.max_duplicate_retries {
                error!(
                    target: "runner",
                    duplicates,
                    max = self.max_duplicate_retries,
                    "Duplicate retry limit exceeded"
                );
                return FactOutcome::Nothing;
            }
            warn!(
                target: "runner",
                retry = duplicates,
                max = self.max_duplicate_retries,
                top = ?check.top_similarity,
                "Duplicate chicken fact candidate, requesting a new fact"
            );
            feedback = Some(duplicate_feedback(&check));
        }
    }

    /// Run forever on the configured period
    pub async fn run_every(self: Arc<Self>, period: Duration) {
        run_every("chicken_facts", period, move || {
            let runner = self.clone();
            async move {
                runner.run_once().await;
            }
        })
        .await
    }
}
