//! Structured JSONL audit log.
//!
//! Every review command, every committed review event and every task action
//! outcome is appended as one JSON object per line with:
//! - Monotonic sequence numbers for ordering
//! - ISO 8601 timestamps with microsecond precision
//! - The user id for correlation
//! - Structured event data in JSON format

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::{ReviewCommand, ReviewError, ReviewEventEnvelope, ReviewId};

/// Append-only JSONL logger shared by the controller, actors and dispatcher.
pub struct StructuredLogger {
    user_id: String,
    seq: AtomicU64,
    log_file: Mutex<File>,
    log_path: PathBuf,
}

/// A single log entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number (unique per logger instance)
    pub seq: u64,
    /// ISO 8601 timestamp with microseconds
    pub ts: String,
    pub user_id: String,
    /// Component that emitted the log
    pub component: String,
    /// Structured event data
    pub event: Value,
}

impl StructuredLogger {
    /// Opens (or creates) `<logs_dir>/audit.jsonl` for the given user.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The logs directory cannot be created
    /// - The log file cannot be opened
    pub fn new(user_id: &str, logs_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let log_path = logs_dir.join("audit.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            user_id: user_id.to_string(),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
            log_path,
        })
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Logs a structured event.
    ///
    /// The event is serialized to JSON and written as a single line.
    /// This method is thread-safe.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = LogEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            user_id: self.user_id.clone(),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                if let Err(e) = writeln!(file, "{}", line).and_then(|()| file.flush()) {
                    tracing::warn!(path = %self.log_path.display(), "audit log write failed: {}", e);
                }
            }
        }
    }

    /// Logs a review command as it is accepted for execution.
    pub fn log_review_command(&self, review_id: &ReviewId, command: &ReviewCommand) {
        self.log(
            "Review",
            serde_json::json!({
                "type": "ReviewCommand",
                "review_id": review_id.to_string(),
                "command": command
            }),
        );
    }

    /// Logs a command that was refused, with the error kind that refused it.
    pub fn log_review_rejected(&self, review_id: &ReviewId, command: &str, error: &ReviewError) {
        self.log(
            "Review",
            serde_json::json!({
                "type": "ReviewRejected",
                "review_id": review_id.to_string(),
                "command": command,
                "kind": format!("{:?}", error.kind()),
                "message": error.to_string()
            }),
        );
    }

    /// Logs a committed review event.
    pub fn log_review_event(&self, envelope: &ReviewEventEnvelope) {
        self.log(
            "Review",
            serde_json::json!({
                "type": "ReviewEvent",
                "review_id": envelope.aggregate_id,
                "sequence": envelope.sequence,
                "event": envelope.event
            }),
        );
    }

    /// Logs the outcome of a task action taken from inside a review step.
    pub fn log_task_action(&self, action: &str, task_id: &str, outcome: Result<(), &ReviewError>) {
        let (ok, error) = match outcome {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        self.log(
            "Tasks",
            serde_json::json!({
                "type": "TaskAction",
                "action": action,
                "task_id": task_id,
                "ok": ok,
                "error": error
            }),
        );
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

#[cfg(test)]
#[path = "tests/structured_logger_tests.rs"]
mod tests;
