//! Semantic duplicate detection over stored facts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::similarity::cosine_similarity;
use crate::store::FactLog;
use crate::{Error, Result};

/// Produces embedding vectors for text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// `Ok(None)` when the service answered without a usable vector
    async fn embed(&self, text: &str) -> Result<Option<Vec<f64>>>;
}

/// A stored fact at or above the similarity threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    pub run_id: String,
    pub fact: String,
    pub source_url: Option<String>,
    pub similarity: f64,
}

/// Report of one duplicate check. Computed fresh each time, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub has_hit: bool,
    pub threshold: f64,
    pub top_similarity: Option<f64>,
    /// Ranked by descending similarity
    pub matches: Vec<SimilarityMatch>,
    /// The candidate's own vector, kept so a successful run can store it
    #[serde(skip)]
    pub candidate_embedding: Vec<f64>,
}

pub struct DuplicateDetector {
    embedder: Arc<dyn EmbeddingProvider>,
    facts: Arc<dyn FactLog>,
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, facts: Arc<dyn FactLog>, threshold: f64) -> Self {
        Self {
            embedder,
            facts,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare `candidate` against every successful fact with a stored embedding.
    ///
    /// Fails only when the candidate itself cannot be embedded; pairs that
    /// cannot be compared are skipped.
    pub async fn check(&self, candidate: &str) -> Result<DuplicateCheck> {
        let candidate_embedding = match self.embedder.embed(candidate.trim()).await {
            Ok(Some(v)) if !v.is_empty() => v,
            Ok(_) => {
                error!(target: "dedup", "Candidate embedding could not be created");
                return Err(Error::EmbeddingUnavailable(
                    "Unable to create embedding for candidate fact".into(),
                ));
            }
            Err(e) => {
                error!(target: "dedup", error = %e, "Embedding service unavailable for duplicate check");
                return Err(match e {
                    Error::EmbeddingUnavailable(_) => e,
                    other => Error::EmbeddingUnavailable(other.to_string()),
                });
            }
        };

        let existing = self.facts.successful().await?;
        let matches = rank_matches(&candidate_embedding, &existing_pairs(&existing), self.threshold);
        let report = DuplicateCheck {
            has_hit: !matches.is_empty(),
            threshold: self.threshold,
            top_similarity: matches.first().map(|m| m.similarity),
            matches,
            candidate_embedding,
        };
        info!(
            target: "dedup",
            compared = existing.len(),
            has_hit = report.has_hit,
            top = ?report.top_similarity,
            "Duplicate check finished"
        );
        Ok(report)
    }
}

struct Stored<'a> {
    run_id: &'a str,
    fact: &'a str,
    source_url: Option<&'a str>,
    embedding: &'a [f64],
}

fn existing_pairs(records: &[crate::records::FactRecord]) -> Vec<Stored<'_>> {
    records
        .iter()
        .filter_map(|r| {
            let fact = r.fact.as_deref().map(str::trim).filter(|f| !f.is_empty())?;
            let embedding = r.fact_embedding.as_deref()?;
            Some(Stored {
                run_id: &r.run_id,
                fact,
                source_url: r.source_url.as_deref(),
                embedding,
            })
        })
        .collect()
}

fn rank_matches(candidate: &[f64], stored: &[Stored<'_>], threshold: f64) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = stored
        .iter()
        .filter_map(|s| {
            let similarity = cosine_similarity(candidate, s.embedding)?;
            (similarity >= threshold).then(|| SimilarityMatch {
                run_id: s.run_id.to_string(),
                fact: s.fact.to_string(),
                source_url: s.source_url.map(str::to_string),
                similarity,
            })
        })
        .collect();
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored<'a>(run_id: &'a str, embedding: &'a [f64]) -> Stored<'a> {
        Stored {
            run_id,
            fact: "fact",
            source_url: None,
            embedding,
        }
    }

    #[test]
    fn ranks_descending_and_drops_below_threshold() {
        let a = [1.0, 0.0];
        let b = [0.9, 0.1];
        let c = [0.0, 1.0];
        let ranked = rank_matches(&[1.0, 0.0], &[stored("b", &b), stored("a", &a), stored("c", &c)], 0.88);
        let ids: Vec<&str> = ranked.iter().map(|m| m.run_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn incomparable_vectors_are_skipped() {
        let short = [1.0];
        let zero = [0.0, 0.0];
        let ranked = rank_matches(&[1.0, 0.0], &[stored("s", &short), stored("z", &zero)], 0.0);
        assert!(ranked.is_empty());
    }
}
