use async_trait::async_trait;
use chrono::Utc;
use henhouse_core::store::InMemoryFactLog;
use henhouse_core::{
    DuplicateDetector, EmbeddingProvider, Error, FactLog, FactRecord, Result, RunOutcome,
};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;

mock! {
    pub Embedder {}

    #[async_trait]
    impl EmbeddingProvider for Embedder {
        async fn embed(&self, text: &str) -> Result<Option<Vec<f64>>>;
    }
}

fn record(run_id: &str, fact: &str, embedding: Option<Vec<f64>>, outcome: RunOutcome) -> FactRecord {
    let now = Utc::now();
    FactRecord {
        run_id: run_id.into(),
        started_at: now,
        completed_at: now,
        duration_millis: 10,
        outcome,
        fact: Some(fact.into()),
        source_url: Some(format!("https://example.com/{run_id}")),
        fact_embedding: embedding,
        error_message: None,
    }
}

fn embedder_returning(vector: Vec<f64>) -> Arc<MockEmbedder> {
    let mut mock = MockEmbedder::new();
    mock.expect_embed()
        .with(eq("Hens purr."))
        .times(1)
        .returning(move |_| Ok(Some(vector.clone())));
    Arc::new(mock)
}

#[tokio::test]
async fn identical_embeddings_are_a_duplicate() {
    let log = Arc::new(InMemoryFactLog::new());
    log.append(record("r1", "Hens purr when happy.", Some(vec![1.0, 0.0]), RunOutcome::Success))
        .await
        .unwrap();

    let detector = DuplicateDetector::new(embedder_returning(vec![1.0, 0.0]), log, 0.88);
    let check = detector.check("  Hens purr.  ").await.unwrap();

    assert!(check.has_hit);
    assert_eq!(check.threshold, 0.88);
    assert_eq!(check.top_similarity, Some(1.0));
    assert_eq!(check.matches.len(), 1);
    assert_eq!(check.matches[0].run_id, "r1");
    assert_eq!(check.matches[0].source_url.as_deref(), Some("https://example.com/r1"));
    assert_eq!(check.candidate_embedding, vec![1.0, 0.0]);
}

#[tokio::test]
async fn only_comparable_successful_records_count() {
    let log = Arc::new(InMemoryFactLog::new());
    for r in [
        record("close", "Close", Some(vec![0.95, 0.05]), RunOutcome::Success),
        record("exact", "Exact", Some(vec![2.0, 0.0]), RunOutcome::Success),
        record("far", "Far", Some(vec![0.0, 1.0]), RunOutcome::Success),
        record("short", "Short", Some(vec![1.0]), RunOutcome::Success),
        record("zero", "Zero", Some(vec![0.0, 0.0]), RunOutcome::Success),
        record("none", "No vector", None, RunOutcome::Success),
        record("blank", "   ", Some(vec![1.0, 0.0]), RunOutcome::Success),
        record("failed", "Failed run", Some(vec![1.0, 0.0]), RunOutcome::Failed),
    ] {
        log.append(r).await.unwrap();
    }

    let detector = DuplicateDetector::new(embedder_returning(vec![1.0, 0.0]), log, 0.88);
    let check = detector.check("Hens purr.").await.unwrap();

    let ids: Vec<&str> = check.matches.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, vec!["exact", "close"]);
    assert_eq!(check.top_similarity, Some(1.0));
}

#[tokio::test]
async fn no_stored_facts_means_no_hit() {
    let detector = DuplicateDetector::new(
        embedder_returning(vec![0.3, 0.4]),
        Arc::new(InMemoryFactLog::new()),
        0.88,
    );
    let check = detector.check("Hens purr.").await.unwrap();
    assert!(!check.has_hit);
    assert_eq!(check.top_similarity, None);
    assert!(check.matches.is_empty());
}

#[tokio::test]
async fn missing_candidate_embedding_fails_the_check() {
    let mut mock = MockEmbedder::new();
    mock.expect_embed().returning(|_| Ok(None));
    let detector = DuplicateDetector::new(Arc::new(mock), Arc::new(InMemoryFactLog::new()), 0.88);

    let err = detector.check("Hens purr.").await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn embedding_transport_error_is_embedding_unavailable() {
    let mut mock = MockEmbedder::new();
    mock.expect_embed()
        .returning(|_| Err(Error::Model("connection refused".into())));
    let detector = DuplicateDetector::new(Arc::new(mock), Arc::new(InMemoryFactLog::new()), 0.88);

    let err = detector.check("Hens purr.").await.unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(msg) if msg.contains("connection refused")));
}

#[test]
fn report_serializes_without_candidate_vector() {
    let check = henhouse_core::DuplicateCheck {
        has_hit: false,
        threshold: 0.88,
        top_similarity: None,
        matches: vec![],
        candidate_embedding: vec![1.0, 2.0],
    };
    let text = serde_json::to_string(&check).unwrap();
    assert!(text.contains("\"hasHit\":false"));
    assert!(!text.contains("candidate"));
}
