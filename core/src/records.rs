//! Persisted shapes: breeds and the append-only run log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal classification of one run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    /// The run produced a usable payload
    Success,
    /// The run completed but produced nothing actionable
    NoOutput,
    /// The run aborted (network, tool or persistence failure)
    Failed,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::NoOutput => "NO_OUTPUT",
            Self::Failed => "FAILED",
        }
    }
}

/// A chicken breed as stored in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Breed {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub egg_color: Option<String>,
    #[serde(default)]
    pub egg_size: Option<String>,
    #[serde(default)]
    pub temperament: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub num_eggs: Option<i64>,
    /// Last time research was applied; `None` means never researched
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One breed research run. Created once at run completion, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreedResearchRecord {
    pub run_id: String,
    pub breed_id: i64,
    pub breed_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_millis: i64,
    pub outcome: RunOutcome,
    pub report: Option<String>,
    pub sources_found: Vec<String>,
    pub fields_updated: Vec<String>,
    pub error_message: Option<String>,
}

/// One chicken fact run. Created once at run completion, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_millis: i64,
    pub outcome: RunOutcome,
    pub fact: Option<String>,
    pub source_url: Option<String>,
    pub fact_embedding: Option<Vec<f64>>,
    pub error_message: Option<String>,
}
