//! Tests for review query.

use super::*;
use crate::domain::types::TimestampUtc;
use std::collections::HashMap;
use tempfile::tempdir;
use uuid::Uuid;

fn envelope(aggregate_id: &str, sequence: usize) -> cqrs_es::EventEnvelope<ReviewAggregate> {
    cqrs_es::EventEnvelope {
        aggregate_id: aggregate_id.to_string(),
        sequence,
        payload: ReviewEvent::ReviewPaused {
            paused_at: TimestampUtc::now(),
        },
        metadata: HashMap::new(),
    }
}

#[tokio::test]
async fn test_query_broadcasts_events_in_order() {
    let (event_tx, mut event_rx) = broadcast::channel(16);
    let query = ReviewQuery::new(event_tx, None);
    let aggregate_id = Uuid::new_v4().to_string();

    query
        .dispatch(
            &aggregate_id,
            &[envelope(&aggregate_id, 2), envelope(&aggregate_id, 3)],
        )
        .await;

    let first = event_rx.recv().await.unwrap();
    let second = event_rx.recv().await.unwrap();
    assert_eq!(first.aggregate_id, aggregate_id);
    assert_eq!(first.sequence, 2);
    assert_eq!(second.sequence, 3);
    assert!(matches!(first.event, ReviewEvent::ReviewPaused { .. }));
}

#[tokio::test]
async fn test_query_without_subscribers_does_not_fail() {
    let (event_tx, _) = broadcast::channel(16);
    let query = ReviewQuery::new(event_tx, None);
    let aggregate_id = Uuid::new_v4().to_string();

    query
        .dispatch(&aggregate_id, &[envelope(&aggregate_id, 1)])
        .await;
}

#[tokio::test]
async fn test_query_writes_audit_entries() {
    let dir = tempdir().unwrap();
    let audit = Arc::new(StructuredLogger::new("alice", dir.path()).unwrap());
    let (event_tx, _) = broadcast::channel(16);
    let query = ReviewQuery::new(event_tx, Some(audit));
    let aggregate_id = Uuid::new_v4().to_string();

    query
        .dispatch(&aggregate_id, &[envelope(&aggregate_id, 5)])
        .await;

    let content = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains(&aggregate_id));
}
