//! Persistence collaborators for breeds and run logs, with in-memory backends.

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::records::{Breed, BreedResearchRecord, FactRecord, RunOutcome};
use crate::{Error, Result};

/// The breed catalog researched by the breed workflow
#[async_trait]
pub trait BreedCatalog: Send + Sync {
    async fn all_breeds(&self) -> Result<Vec<Breed>>;
    async fn breed(&self, id: i64) -> Result<Option<Breed>>;
    /// Replace an existing breed; unknown ids are an error
    async fn update(&self, breed: Breed) -> Result<()>;
}

/// Append-only log of breed research runs
#[async_trait]
pub trait ResearchLog: Send + Sync {
    async fn append(&self, record: BreedResearchRecord) -> Result<()>;
    async fn records(&self) -> Result<Vec<BreedResearchRecord>>;
}

/// Append-only log of chicken fact runs
#[async_trait]
pub trait FactLog: Send + Sync {
    async fn append(&self, record: FactRecord) -> Result<()>;
    async fn records(&self) -> Result<Vec<FactRecord>>;

    async fn successful(&self) -> Result<Vec<FactRecord>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|r| r.outcome == RunOutcome::Success)
            .collect())
    }
}

/// Breed catalog held in a concurrent map
#[derive(Clone, Default)]
pub struct InMemoryBreedCatalog {
    breeds: Arc<DashMap<i64, Breed>>,
}

impl InMemoryBreedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_breeds(breeds: impl IntoIterator<Item = Breed>) -> Self {
        let catalog = Self::new();
        for breed in breeds {
            catalog.breeds.insert(breed.id, breed);
        }
        catalog
    }

    /// Seed from a JSON array of breeds
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let breeds: Vec<Breed> = serde_json::from_str(&text)?;
        info!(target: "store", path = %path.as_ref().display(), count = breeds.len(), "Loaded breed seed");
        Ok(Self::with_breeds(breeds))
    }

    pub fn len(&self) -> usize {
        self.breeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breeds.is_empty()
    }
}

#[async_trait]
impl BreedCatalog for InMemoryBreedCatalog {
    async fn all_breeds(&self) -> Result<Vec<Breed>> {
        let mut breeds: Vec<Breed> = self.breeds.iter().map(|e| e.value().clone()).collect();
        breeds.sort_by_key(|b| b.id);
        Ok(breeds)
    }

    async fn breed(&self, id: i64) -> Result<Option<Breed>> {
        Ok(self.breeds.get(&id).map(|b| b.value().clone()))
    }

    async fn update(&self, breed: Breed) -> Result<()> {
        match self.breeds.get_mut(&breed.id) {
            Some(mut existing) => {
                *existing = breed;
                Ok(())
            }
            None => Err(Error::Storage(format!("Breed not found with ID {}", breed.id))),
        }
    }
}

/// Run log keyed by run id; a run id can be written once
pub struct InMemoryLog<R> {
    entries: DashMap<String, R>,
}

impl<R> Default for InMemoryLog<R> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<R: Clone> InMemoryLog<R> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_once(&self, run_id: &str, record: R) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.entries.entry(run_id.to_string()) {
            Entry::Occupied(_) => Err(Error::Storage(format!(
                "Record for run {run_id} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn snapshot(&self) -> Vec<R> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type InMemoryResearchLog = InMemoryLog<BreedResearchRecord>;
pub type InMemoryFactLog = InMemoryLog<FactRecord>;

#[async_trait]
impl ResearchLog for InMemoryLog<BreedResearchRecord> {
    async fn append(&self, record: BreedResearchRecord) -> Result<()> {
        let run_id = record.run_id.clone();
        self.insert_once(&run_id, record)
    }

    async fn records(&self) -> Result<Vec<BreedResearchRecord>> {
        let mut all = self.snapshot();
        all.sort_by_key(|r| r.started_at);
        Ok(all)
    }
}

#[async_trait]
impl FactLog for InMemoryLog<FactRecord> {
    async fn append(&self, record: FactRecord) -> Result<()> {
        let run_id = record.run_id.clone();
        self.insert_once(&run_id, record)
    }

    async fn records(&self) -> Result<Vec<FactRecord>> {
        let mut all = self.snapshot();
        all.sort_by_key(|r| r.started_at);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fact(run_id: &str, outcome: RunOutcome) -> FactRecord {
        let now = Utc::now();
        FactRecord {
            run_id: run_id.into(),
            started_at: now,
            completed_at: now,
            duration_millis: 0,
            outcome,
            fact: Some("Hens dream.".into()),
            source_url: Some("https://a".into()),
            fact_embedding: None,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn fact_log_is_append_only() {
        let log = InMemoryFactLog::new();
        log.append(fact("r1", RunOutcome::Success)).await.unwrap();
        let err = log.append(fact("r1", RunOutcome::Failed)).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(log.records().await.unwrap()[0].outcome, RunOutcome::Success);
    }

    #[tokio::test]
    async fn successful_filters_outcomes() {
        let log = InMemoryFactLog::new();
        log.append(fact("r1", RunOutcome::Success)).await.unwrap();
        log.append(fact("r2", RunOutcome::NoOutput)).await.unwrap();
        log.append(fact("r3", RunOutcome::Failed)).await.unwrap();
        let ok = log.successful().await.unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].run_id, "r1");
    }

    #[tokio::test]
    async fn update_of_unknown_breed_fails() {
        let catalog = InMemoryBreedCatalog::with_breeds([Breed {
            id: 1,
            name: "Silkie".into(),
            ..Default::default()
        }]);
        let err = catalog
            .update(Breed {
                id: 9,
                name: "Ghost".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(catalog.breed(1).await.unwrap().unwrap().name, "Silkie");
    }
}
