use std::path::PathBuf;

use tempfile::tempdir;

use crate::model::{ErrorCategory, ErrorEvent, ErrorRecord, KnowledgeDocument, SolutionPattern};
use crate::store::{
    builtin_patterns, similarity_score, FileBackedPatternStore, PatternStore, StoreError,
};

fn store_at(dir: &tempfile::TempDir, name: &str) -> (PathBuf, FileBackedPatternStore) {
    let path = dir.path().join(name);
    let store = FileBackedPatternStore::open(&path).expect("open store");
    (path, store)
}

fn timeout_event() -> ErrorEvent {
    ErrorEvent::new("Read timed out after 30s")
}

#[test]
fn similarity_scores_category_token_in_symptom() {
    let event = timeout_event();
    let pattern = SolutionPattern::new(
        ErrorCategory::Timeout,
        "request timeout against upstream",
        "retry",
    );
    let score = similarity_score(ErrorCategory::Timeout, &event, &pattern);
    assert!((score - 0.5).abs() < 1e-9);
}

#[test]
fn similarity_scores_context_keyword_in_message() {
    let event = ErrorEvent::new("Read timed out after 30s on host alpha").context("host", "alpha");
    let pattern = SolutionPattern::new(
        ErrorCategory::Timeout,
        "request timeout against upstream",
        "retry",
    );
    let score = similarity_score(ErrorCategory::Timeout, &event, &pattern);
    assert!((score - 0.8).abs() < 1e-9);
}

#[test]
fn similarity_is_zero_without_any_overlap() {
    let event = ErrorEvent::new("disk full");
    let pattern = SolutionPattern::new(
        ErrorCategory::Permission,
        "credentials rejected by gateway",
        "refresh token",
    );
    let score = similarity_score(ErrorCategory::Unknown, &event, &pattern);
    assert_eq!(score, 0.0);
}

#[tokio::test]
async fn missing_file_reads_as_empty_store() {
    let dir = tempdir().expect("tempdir");
    let (path, store) = store_at(&dir, "knowledge.json");
    assert!(!path.exists());

    let matches = store
        .find_matches(ErrorCategory::Timeout, &timeout_event(), 0.8, true)
        .await
        .expect("query");
    assert!(matches.is_empty());
}

#[tokio::test]
async fn document_round_trips_through_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("knowledge.json");

    {
        let store = FileBackedPatternStore::open(&path).expect("open store");
        let pattern = SolutionPattern::new(ErrorCategory::HttpError, "http 500 from api", "retry")
            .with_confidence(0.7);
        store.upsert_pattern(&pattern).await.expect("upsert");

        let event = ErrorEvent::new("HTTP 500 from api");
        let record = ErrorRecord::from_event(&event, ErrorCategory::HttpError);
        store.record_error(&record).await.expect("record");
        store
            .link_error_to_solution(&record.id, &pattern.id)
            .await
            .expect("link");
    }

    // Reopen and verify everything survived the rewrite.
    let store = FileBackedPatternStore::open(&path).expect("reopen store");
    let matches = store
        .find_matches(ErrorCategory::HttpError, &ErrorEvent::new("HTTP 500 from api"), 0.8, true)
        .await
        .expect("query");
    assert_eq!(matches.len(), 1);
    assert!((matches[0].pattern.confidence - 0.7).abs() < 1e-9);

    let raw = std::fs::read_to_string(&path).expect("read document");
    let doc: KnowledgeDocument = serde_json::from_str(&raw).expect("parse document");
    assert_eq!(doc.errors.len(), 1);
    assert_eq!(doc.solutions.len(), 1);
    assert_eq!(doc.error_solution_map.len(), 1);
}

#[tokio::test]
async fn corrupt_document_fails_open_on_queries_and_closed_on_writes() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("knowledge.json");
    std::fs::write(&path, "{ not json").expect("write corrupt file");

    let store = FileBackedPatternStore::open(&path).expect("open degraded store");

    let matches = store
        .find_matches(ErrorCategory::Timeout, &timeout_event(), 0.8, true)
        .await
        .expect("degraded query should still succeed");
    assert!(matches.is_empty());

    let record = ErrorRecord::from_event(&timeout_event(), ErrorCategory::Timeout);
    let err = store.record_error(&record).await.expect_err("write must be refused");
    assert!(matches!(err, StoreError::CorruptDocument(_)));

    // The corrupt bytes must still be on disk, untouched.
    assert_eq!(std::fs::read_to_string(&path).expect("reread"), "{ not json");
}

#[tokio::test]
async fn reinforcing_unknown_pattern_is_a_typed_error() {
    let dir = tempdir().expect("tempdir");
    let (_path, store) = store_at(&dir, "knowledge.json");

    let err = store
        .reinforce("no-such-pattern", true)
        .await
        .expect_err("unknown id must be reported");
    assert!(matches!(err, StoreError::PatternNotFound(_)));
}

#[tokio::test]
async fn reinforce_persists_updated_confidence() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("knowledge.json");

    {
        let store = FileBackedPatternStore::open(&path).expect("open store");
        let pattern = SolutionPattern::new(ErrorCategory::Network, "connection dropped", "reconnect")
            .with_id("net-1")
            .with_confidence(0.5);
        store.upsert_pattern(&pattern).await.expect("upsert");

        let updated = store.reinforce("net-1", true).await.expect("reinforce");
        assert!((updated.confidence - 0.55).abs() < 1e-9);
        assert_eq!(updated.usage.attempts(), 1);
    }

    let store = FileBackedPatternStore::open(&path).expect("reopen store");
    let pattern = store
        .get_pattern("net-1")
        .await
        .expect("get")
        .expect("pattern present");
    assert!((pattern.confidence - 0.55).abs() < 1e-9);
    assert_eq!(pattern.usage.successes(), 1);
}

#[tokio::test]
async fn seeding_is_idempotent_and_preserves_reinforced_confidence() {
    let dir = tempdir().expect("tempdir");
    let (_path, store) = store_at(&dir, "knowledge.json");

    store.seed_builtin_patterns().await.expect("seed");
    store.seed_builtin_patterns().await.expect("seed again");

    let seeded = builtin_patterns();
    for expected in &seeded {
        let stored = store
            .get_pattern(&expected.id)
            .await
            .expect("get")
            .expect("seeded pattern present");
        assert_eq!(stored.pattern_type, expected.pattern_type);
    }

    // Reinforce one builtin down, reseed, and make sure the adjusted
    // confidence is not reset.
    store
        .reinforce("builtin-network-reconnect", false)
        .await
        .expect("reinforce");
    store.seed_builtin_patterns().await.expect("reseed");

    let network = store
        .get_pattern("builtin-network-reconnect")
        .await
        .expect("get")
        .expect("pattern present");
    assert!((network.confidence - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn exact_category_match_bypasses_similarity_floor_only_when_enabled() {
    let dir = tempdir().expect("tempdir");
    let (_path, store) = store_at(&dir, "knowledge.json");

    // Symptom shares no text with the event, so similarity is 0.0 and the
    // only way in is the category bypass.
    let pattern = SolutionPattern::new(ErrorCategory::Timeout, "slow upstream dependency", "retry")
        .with_id("t-1")
        .with_confidence(0.9);
    store.upsert_pattern(&pattern).await.expect("upsert");

    let event = ErrorEvent::new("Read timed out after 30s");

    let with_bypass = store
        .find_matches(ErrorCategory::Timeout, &event, 0.8, true)
        .await
        .expect("query");
    assert_eq!(with_bypass.len(), 1);

    let without_bypass = store
        .find_matches(ErrorCategory::Timeout, &event, 0.8, false)
        .await
        .expect("query");
    assert!(without_bypass.is_empty());
}

#[tokio::test]
async fn matches_are_sorted_by_descending_confidence() {
    let dir = tempdir().expect("tempdir");
    let (_path, store) = store_at(&dir, "knowledge.json");

    for (id, confidence) in [("a", 0.4), ("b", 0.9), ("c", 0.6)] {
        let pattern = SolutionPattern::new(ErrorCategory::Timeout, "timeout", "retry")
            .with_id(id)
            .with_confidence(confidence);
        store.upsert_pattern(&pattern).await.expect("upsert");
    }

    let matches = store
        .find_matches(ErrorCategory::Timeout, &timeout_event(), 0.8, true)
        .await
        .expect("query");
    let ids: Vec<&str> = matches.iter().map(|m| m.pattern.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}
