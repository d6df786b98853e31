//! File-based event store implementation.
//!
//! Stores every review of one user as JSONL (one JSON object per line) with
//! support for:
//! - Optimistic concurrency via file locking
//! - Per-review snapshots for faster aggregate loading
//! - Single-write commits, so a multi-event commit is never half-visible
//! - Atomic snapshot writes via temp file + rename

use crate::domain::errors::ReviewError;
use crate::domain::session::ReviewSession;
use crate::domain::types::{ReviewId, TimestampUtc};
use crate::domain::{ReviewAggregate, ReviewEvent};
use async_trait::async_trait;
use chrono::Utc;
use cqrs_es::{
    Aggregate, AggregateContext, AggregateError, DomainEvent, EventEnvelope, EventStore,
};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A stored event record in the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub aggregate_id: String,
    pub sequence: u64,
    pub recorded_at: TimestampUtc,
    pub event_type: String,
    pub event_version: String,
    pub event: ReviewEvent,
    pub metadata: HashMap<String, String>,
}

/// A stored snapshot for faster aggregate loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub aggregate_id: String,
    pub sequence: u64,
    pub snapshot_at: TimestampUtc,
    pub state: ReviewAggregate,
}

/// File-based event store configuration.
#[derive(Debug, Clone)]
pub struct FileEventStore {
    /// Path to the JSONL event log file.
    pub log_path: PathBuf,
    /// Directory holding one `<review_id>.json` snapshot per review.
    pub snapshot_dir: PathBuf,
    /// Snapshot after every N events (0 = disabled).
    pub snapshot_every: u64,
}

/// Aggregate context for file-based storage.
pub struct FileAggregateContext<A: Aggregate> {
    /// The aggregate ID.
    pub aggregate_id: String,
    /// The rehydrated aggregate.
    pub aggregate: A,
    /// The current sequence number (last applied event).
    pub current_sequence: u64,
}

impl<A: Aggregate> AggregateContext<A> for FileAggregateContext<A> {
    fn aggregate(&self) -> &A {
        &self.aggregate
    }
}

type StoreResult<T> = Result<T, AggregateError<ReviewError>>;

fn unexpected(e: impl std::error::Error + Send + Sync + 'static) -> AggregateError<ReviewError> {
    AggregateError::UnexpectedError(Box::new(e))
}

impl FileEventStore {
    /// Creates a new file event store.
    pub fn new(log_path: PathBuf, snapshot_dir: PathBuf, snapshot_every: u64) -> Self {
        Self {
            log_path,
            snapshot_dir,
            snapshot_every,
        }
    }

    pub fn snapshot_path(&self, aggregate_id: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{}.json", aggregate_id))
    }

    /// Rebuilds one review from the log. `Ok(None)` when it was never started.
    pub async fn load_session(&self, id: &ReviewId) -> Result<Option<ReviewSession>, ReviewError> {
        let context = self.load_aggregate(&id.to_string()).await?;
        Ok(context.aggregate.into_session())
    }

    /// Replays the whole log and returns every review, oldest first.
    pub fn list_sessions(&self) -> Result<Vec<ReviewSession>, ReviewError> {
        let Some(file) = open_locked_shared(&self.log_path)? else {
            return Ok(Vec::new());
        };

        let mut order: Vec<String> = Vec::new();
        let mut aggregates: HashMap<String, ReviewAggregate> = HashMap::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            let stored: StoredEvent = serde_json::from_str(&line)?;
            let aggregate = aggregates
                .entry(stored.aggregate_id.clone())
                .or_insert_with(|| {
                    order.push(stored.aggregate_id.clone());
                    ReviewAggregate::default()
                });
            aggregate.apply(stored.event);
        }

        Ok(order
            .into_iter()
            .filter_map(|id| aggregates.remove(&id))
            .filter_map(ReviewAggregate::into_session)
            .collect())
    }
}

fn open_locked_shared(path: &Path) -> std::io::Result<Option<File>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    file.lock_shared()?;
    Ok(Some(file))
}

#[async_trait]
impl EventStore<ReviewAggregate> for FileEventStore {
    type AC = FileAggregateContext<ReviewAggregate>;

    async fn load_events(
        &self,
        aggregate_id: &str,
    ) -> StoreResult<Vec<EventEnvelope<ReviewAggregate>>> {
        let Some(file) = open_locked_shared(&self.log_path).map_err(unexpected)? else {
            return Ok(Vec::new());
        };

        let reader = BufReader::new(file);
        let mut envelopes = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(unexpected)?;
            let stored: StoredEvent = serde_json::from_str(&line)
                .map_err(|e| AggregateError::DeserializationError(Box::new(e)))?;

            if stored.aggregate_id == aggregate_id {
                // Validate event type and version match
                if stored.event_type != stored.event.event_type()
                    || stored.event_version != stored.event.event_version()
                {
                    return Err(unexpected(std::io::Error::new(
                        ErrorKind::InvalidData,
                        "event version/type mismatch",
                    )));
                }

                envelopes.push(EventEnvelope {
                    aggregate_id: stored.aggregate_id,
                    sequence: stored.sequence as usize,
                    payload: stored.event,
                    metadata: stored.metadata,
                });
            }
        }

        Ok(envelopes)
    }

    async fn load_aggregate(&self, aggregate_id: &str) -> StoreResult<Self::AC> {
        let mut aggregate = ReviewAggregate::default();
        let mut current_sequence = 0u64;

        // Try to load from snapshot first
        if let Some(snapshot) = load_snapshot(&self.snapshot_path(aggregate_id))? {
            if snapshot.aggregate_id == aggregate_id {
                aggregate = snapshot.state;
                current_sequence = snapshot.sequence;
            }
        }

        // Apply events after snapshot
        let events = self.load_events(aggregate_id).await?;
        for event in events {
            let seq = event.sequence as u64;
            if seq > current_sequence {
                current_sequence = seq;
                aggregate.apply(event.payload);
            }
        }

        Ok(FileAggregateContext {
            aggregate_id: aggregate_id.to_string(),
            aggregate,
            current_sequence,
        })
    }

    async fn commit(
        &self,
        events: Vec<ReviewEvent>,
        context: Self::AC,
        metadata: HashMap<String, String>,
    ) -> StoreResult<Vec<EventEnvelope<ReviewAggregate>>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(parent) = self.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(unexpected)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.log_path)
            .map_err(unexpected)?;

        // Acquire exclusive lock for writing
        file.lock_exclusive().map_err(unexpected)?;

        let FileAggregateContext {
            aggregate_id,
            mut aggregate,
            current_sequence,
        } = context;

        // Check for concurrent writes (optimistic concurrency)
        let last_sequence = read_last_sequence(&file, &aggregate_id)?;
        if last_sequence != current_sequence {
            return Err(AggregateError::AggregateConflict);
        }

        let recorded_at = TimestampUtc(Utc::now());
        let mut sequence = current_sequence;
        let mut buffer = String::new();
        let mut envelopes: Vec<EventEnvelope<ReviewAggregate>> = Vec::new();

        for event in events {
            sequence += 1;

            let record = StoredEvent {
                aggregate_id: aggregate_id.clone(),
                sequence,
                recorded_at,
                event_type: event.event_type(),
                event_version: event.event_version(),
                event: event.clone(),
                metadata: metadata.clone(),
            };

            buffer.push_str(&serde_json::to_string(&record).map_err(unexpected)?);
            buffer.push('\n');

            envelopes.push(EventEnvelope {
                aggregate_id: aggregate_id.clone(),
                sequence: sequence as usize,
                payload: event,
                metadata: metadata.clone(),
            });
        }

        file.write_all(buffer.as_bytes()).map_err(unexpected)?;
        file.flush().map_err(unexpected)?;
        file.sync_all().map_err(unexpected)?;

        tracing::debug!(
            review_id = %aggregate_id,
            sequence,
            events = envelopes.len(),
            "committed review events"
        );

        // Apply events to aggregate for potential snapshot
        for envelope in &envelopes {
            aggregate.apply(envelope.payload.clone());
        }

        if should_snapshot(current_sequence, sequence, self.snapshot_every) {
            let path = self.snapshot_path(&aggregate_id);
            let snapshot = StoredSnapshot {
                aggregate_id,
                sequence,
                snapshot_at: recorded_at,
                state: aggregate,
            };
            // The log is already durable; a failed snapshot only costs replay time.
            if let Err(e) = save_snapshot(&path, &snapshot) {
                tracing::warn!(path = %path.display(), "failed to write snapshot: {}", e);
            }
        }

        Ok(envelopes)
    }
}

/// Load a snapshot from disk.
fn load_snapshot(path: &Path) -> StoreResult<Option<StoredSnapshot>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unexpected(e)),
    };

    let snapshot: StoredSnapshot = serde_json::from_str(&content)
        .map_err(|e| AggregateError::DeserializationError(Box::new(e)))?;

    Ok(Some(snapshot))
}

/// Save a snapshot to disk atomically.
fn save_snapshot(path: &Path, snapshot: &StoredSnapshot) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(unexpected)?;
    }

    let content = serde_json::to_string(snapshot).map_err(unexpected)?;

    // Write to temp file, then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, content).map_err(unexpected)?;
    std::fs::rename(&tmp_path, path).map_err(unexpected)?;

    Ok(())
}

/// Read the last sequence number for an aggregate from the log file.
fn read_last_sequence(file: &File, aggregate_id: &str) -> StoreResult<u64> {
    let mut reader = BufReader::new(file.try_clone().map_err(unexpected)?);

    reader.seek(SeekFrom::Start(0)).map_err(unexpected)?;

    let mut last_sequence = 0u64;

    for line in reader.lines() {
        let line = line.map_err(unexpected)?;
        let stored: StoredEvent = serde_json::from_str(&line)
            .map_err(|e| AggregateError::DeserializationError(Box::new(e)))?;

        if stored.aggregate_id == aggregate_id {
            last_sequence = stored.sequence;
        }
    }

    Ok(last_sequence)
}

/// True when the commit `(before, after]` crossed a multiple of the threshold.
fn should_snapshot(before: u64, after: u64, snapshot_every: u64) -> bool {
    if snapshot_every == 0 {
        return false;
    }
    after / snapshot_every > before / snapshot_every
}

#[cfg(test)]
#[path = "tests/file_store_tests.rs"]
mod tests;
