//! CQRS query handler for committed review events.
//!
//! The ReviewQuery records each committed event in the audit log and
//! broadcasts it to subscribers via a tokio channel.

use super::{ReviewAggregate, ReviewEvent};
use crate::structured_logger::StructuredLogger;
use async_trait::async_trait;
use cqrs_es::Query;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Serializable wrapper for event envelopes used in broadcasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEventEnvelope {
    pub aggregate_id: String,
    pub sequence: u64,
    pub event: ReviewEvent,
}

impl From<&cqrs_es::EventEnvelope<ReviewAggregate>> for ReviewEventEnvelope {
    fn from(source: &cqrs_es::EventEnvelope<ReviewAggregate>) -> Self {
        Self {
            aggregate_id: source.aggregate_id.clone(),
            sequence: source.sequence as u64,
            event: source.payload.clone(),
        }
    }
}

pub struct ReviewQuery {
    event_tx: broadcast::Sender<ReviewEventEnvelope>,
    audit: Option<Arc<StructuredLogger>>,
}

impl ReviewQuery {
    pub fn new(
        event_tx: broadcast::Sender<ReviewEventEnvelope>,
        audit: Option<Arc<StructuredLogger>>,
    ) -> Self {
        Self { event_tx, audit }
    }
}

#[async_trait]
impl Query<ReviewAggregate> for ReviewQuery {
    async fn dispatch(
        &self,
        aggregate_id: &str,
        events: &[cqrs_es::EventEnvelope<ReviewAggregate>],
    ) {
        for event in events {
            let envelope = ReviewEventEnvelope::from(event);
            if let Some(audit) = &self.audit {
                audit.log_review_event(&envelope);
            }
            // No receivers is normal when nobody subscribed.
            if self.event_tx.send(envelope).is_err() {
                tracing::trace!(review_id = aggregate_id, "no event subscribers");
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod tests;
