use super::*;
use crate::domain::catalog::StepCatalog;
use crate::domain::services::{ReviewClock, ReviewServices};
use crate::domain::step_data::StepPayload;
use crate::domain::types::{ReviewStatus, ReviewType, StepId, UserId};
use crate::domain::ReviewCommand;
use cqrs_es::CqrsFramework;
use tempfile::tempdir;

fn store_in(dir: &Path, snapshot_every: u64) -> FileEventStore {
    FileEventStore::new(
        dir.join("reviews.jsonl"),
        dir.join("snapshots"),
        snapshot_every,
    )
}

fn build_cqrs_for_test(
    snapshot_every: u64,
) -> (tempfile::TempDir, CqrsFramework<ReviewAggregate, FileEventStore>) {
    let dir = tempdir().expect("temp dir");
    let store = store_in(dir.path(), snapshot_every);
    let services = ReviewServices::for_tests(ReviewClock::system());
    let queries: Vec<Box<dyn cqrs_es::Query<ReviewAggregate>>> = Vec::new();
    (dir, CqrsFramework::new(store, queries, services))
}

fn start(id: &ReviewId, review_type: ReviewType) -> ReviewCommand {
    ReviewCommand::StartReview {
        review_id: id.clone(),
        user_id: UserId::from("alice"),
        review_type,
        steps: StepCatalog::default().steps_for(review_type),
    }
}

fn complete(step: &str) -> ReviewCommand {
    ReviewCommand::CompleteStep {
        step_id: StepId::from(step),
        data: StepPayload::new(),
    }
}

#[tokio::test]
async fn test_start_review_persists_session() {
    let (dir, cqrs) = build_cqrs_for_test(50);
    let id = ReviewId::new();
    cqrs.execute(&id.to_string(), start(&id, ReviewType::Weekly))
        .await
        .unwrap();

    let session = store_in(dir.path(), 50)
        .load_session(&id)
        .await
        .unwrap()
        .expect("session");
    assert_eq!(session.id(), &id);
    assert_eq!(session.review_type(), ReviewType::Weekly);
    assert_eq!(session.total_steps(), 8);
    assert_eq!(session.version(), 1);
}

#[tokio::test]
async fn test_unknown_review_loads_as_none() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path(), 50);
    assert!(store.load_session(&ReviewId::new()).await.unwrap().is_none());
    assert!(store.list_sessions().unwrap().is_empty());
}

#[tokio::test]
async fn test_multi_event_commit_is_one_contiguous_block() {
    let (dir, cqrs) = build_cqrs_for_test(50);
    let id = ReviewId::new();
    cqrs.execute(&id.to_string(), start(&id, ReviewType::Daily))
        .await
        .unwrap();
    cqrs.execute(&id.to_string(), complete("welcome")).await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("reviews.jsonl")).unwrap();
    let sequences: Vec<u64> = content
        .lines()
        .map(|l| serde_json::from_str::<StoredEvent>(l).unwrap().sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_stale_context_is_a_conflict() {
    let dir = tempdir().unwrap();
    let store = store_in(dir.path(), 50);
    let id = ReviewId::new();
    let agg_id = id.to_string();

    let first = store.load_aggregate(&agg_id).await.unwrap();
    let started = ReviewEvent::ReviewStarted {
        review_id: id.clone(),
        user_id: UserId::from("alice"),
        review_type: ReviewType::Daily,
        steps: StepCatalog::default().steps_for(ReviewType::Daily),
        started_at: TimestampUtc::now(),
    };
    store
        .commit(vec![started.clone()], first, HashMap::new())
        .await
        .unwrap();

    // A context loaded before that commit is now stale.
    let stale = FileAggregateContext {
        aggregate_id: agg_id.clone(),
        aggregate: ReviewAggregate::default(),
        current_sequence: 0,
    };
    let result = store.commit(vec![started], stale, HashMap::new()).await;
    assert!(matches!(result, Err(AggregateError::AggregateConflict)));
}

#[tokio::test]
async fn test_snapshot_written_when_threshold_crossed() {
    let (dir, cqrs) = build_cqrs_for_test(2);
    let id = ReviewId::new();
    cqrs.execute(&id.to_string(), start(&id, ReviewType::Daily))
        .await
        .unwrap();
    let snapshot_path = dir.path().join("snapshots").join(format!("{}.json", id));
    assert!(!snapshot_path.exists());

    cqrs.execute(&id.to_string(), complete("welcome")).await.unwrap();
    assert!(snapshot_path.exists());

    let snapshot = load_snapshot(&snapshot_path).unwrap().unwrap();
    assert_eq!(snapshot.sequence, 3);

    // Loading from the snapshot plus the tail matches a full replay.
    cqrs.execute(&id.to_string(), ReviewCommand::Pause).await.unwrap();
    let from_snapshot = store_in(dir.path(), 2).load_session(&id).await.unwrap().unwrap();
    let replayed = store_in(dir.path(), 0)
        .list_sessions()
        .unwrap()
        .into_iter()
        .find(|s| s.id() == &id)
        .unwrap();
    assert_eq!(from_snapshot, replayed);
    assert_eq!(from_snapshot.status(), ReviewStatus::Paused);
}

#[tokio::test]
async fn test_list_sessions_keeps_start_order() {
    let (dir, cqrs) = build_cqrs_for_test(50);
    let daily = ReviewId::new();
    let weekly = ReviewId::new();
    cqrs.execute(&daily.to_string(), start(&daily, ReviewType::Daily))
        .await
        .unwrap();
    cqrs.execute(&weekly.to_string(), start(&weekly, ReviewType::Weekly))
        .await
        .unwrap();
    cqrs.execute(&daily.to_string(), ReviewCommand::Abandon { reason: None })
        .await
        .unwrap();

    let sessions = store_in(dir.path(), 50).list_sessions().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id(), &daily);
    assert_eq!(sessions[0].status(), ReviewStatus::Abandoned);
    assert_eq!(sessions[1].id(), &weekly);
    assert_eq!(sessions[1].status(), ReviewStatus::Active);
}

#[tokio::test]
async fn test_unreadable_log_is_a_repository_error() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("reviews.jsonl")).unwrap();
    let store = store_in(dir.path(), 50);

    let err = store.load_session(&ReviewId::new()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(store.list_sessions().unwrap_err().is_retryable());
}

#[test]
fn test_should_snapshot_detects_crossing() {
    assert!(!should_snapshot(0, 1, 0));
    assert!(should_snapshot(1, 3, 2));
    assert!(!should_snapshot(2, 3, 2));
    assert!(should_snapshot(49, 50, 50));
}
