//! Entry point for starting and reopening reviews.
//!
//! The controller owns no session state of its own. Every decision is made
//! against the user's event log, and every live session is driven through a
//! [`ReviewHandle`].

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::actor::{review_framework, ReviewHandle};
use crate::domain::catalog::StepCatalog;
use crate::domain::cqrs::{ReviewCommand, ReviewEventEnvelope};
use crate::domain::errors::ReviewError;
use crate::domain::period::Calendar;
use crate::domain::services::ReviewServices;
use crate::domain::session::ReviewSession;
use crate::domain::types::{ReviewId, ReviewStatus, ReviewType, TimestampUtc, UserId};
use crate::event_store::FileEventStore;
use crate::structured_logger::StructuredLogger;

/// Buffered committed events per handle before slow subscribers lag.
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct ReviewController {
    user: UserId,
    store: FileEventStore,
    start_lock: PathBuf,
    catalog: StepCatalog,
    services: ReviewServices,
    calendar: Calendar,
    audit: Option<Arc<StructuredLogger>>,
}

impl ReviewController {
    pub fn new(
        user: UserId,
        store: FileEventStore,
        start_lock: PathBuf,
        catalog: StepCatalog,
        services: ReviewServices,
        calendar: Calendar,
    ) -> Self {
        Self {
            user,
            store,
            start_lock,
            catalog,
            services,
            calendar,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<StructuredLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Starts a review of `review_type`, or reopens the live one.
    ///
    /// At most one Active/Paused session exists per user and type. When a
    /// review of this type was already completed in the current period
    /// (local day or local week) this fails with `AlreadyCompleted`.
    pub async fn start(&self, review_type: ReviewType) -> Result<ReviewHandle, ReviewError> {
        let _guard = self.lock_start().await?;
        let sessions = self.store.list_sessions()?;

        if let Some(live) = latest_live(&sessions, review_type) {
            info!(review_id = %live.id(), %review_type, "resuming live review");
            return self.spawn_handle(live.clone(), None).await;
        }

        let now = self.services.clock.instant();
        let period = self.calendar.period_containing(review_type, now);
        let finished = sessions
            .iter()
            .filter(|s| s.review_type() == review_type && s.status() == ReviewStatus::Completed)
            .filter_map(ReviewSession::completed_at)
            .filter(|at| period.contains(at.0))
            .max();
        if let Some(completed_at) = finished {
            return Err(ReviewError::AlreadyCompleted {
                review_type,
                completed_at: completed_at.to_rfc3339(),
            });
        }

        let review_id = ReviewId::new();
        let command = ReviewCommand::StartReview {
            review_id: review_id.clone(),
            user_id: self.user.clone(),
            review_type,
            steps: self.catalog.steps_for(review_type),
        };
        if let Some(audit) = &self.audit {
            audit.log_review_command(&review_id, &command);
        }

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cqrs = review_framework(
            &self.store,
            &self.services,
            event_tx.clone(),
            self.audit.clone(),
        );
        cqrs.execute(&review_id.to_string(), command).await?;

        let session = self.load(&review_id).await?;
        info!(
            review_id = %review_id,
            %review_type,
            steps = session.total_steps(),
            "review started"
        );
        self.spawn_handle(session, Some(event_tx)).await
    }

    /// The most recent Active or Paused session of `review_type`, if any.
    pub fn live_session(&self, review_type: ReviewType) -> Result<Option<ReviewSession>, ReviewError> {
        let sessions = self.store.list_sessions()?;
        Ok(latest_live(&sessions, review_type).cloned())
    }

    /// Opens a handle on any persisted review, live or finished.
    pub async fn open(&self, review_id: &ReviewId) -> Result<ReviewHandle, ReviewError> {
        let session = self.load(review_id).await?;
        self.spawn_handle(session, None).await
    }

    /// Every review of this user, newest first.
    pub fn history(&self) -> Result<Vec<ReviewSession>, ReviewError> {
        let mut sessions = self.store.list_sessions()?;
        sessions.sort_by_key(|s| std::cmp::Reverse(s.started_at()));
        Ok(sessions)
    }

    /// When the last completed review of `review_type` finished.
    pub fn last_completed(&self, review_type: ReviewType) -> Result<Option<TimestampUtc>, ReviewError> {
        Ok(self
            .store
            .list_sessions()?
            .iter()
            .filter(|s| s.review_type() == review_type)
            .filter_map(ReviewSession::completed_at)
            .max())
    }

    async fn load(&self, review_id: &ReviewId) -> Result<ReviewSession, ReviewError> {
        self.store
            .load_session(review_id)
            .await?
            .ok_or_else(|| ReviewError::not_found(format!("review {}", review_id)))
    }

    async fn spawn_handle(
        &self,
        session: ReviewSession,
        event_tx: Option<broadcast::Sender<ReviewEventEnvelope>>,
    ) -> Result<ReviewHandle, ReviewError> {
        let event_tx = event_tx.unwrap_or_else(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0);
        ReviewHandle::spawn(
            self.store.clone(),
            self.services.clone(),
            session,
            event_tx,
            self.audit.clone(),
        )
        .await
    }

    /// Serializes `start` across processes. Released when the file drops.
    ///
    /// A lock held by another process is waited for on the blocking pool.
    async fn lock_start(&self) -> Result<File, ReviewError> {
        if let Some(parent) = self.start_lock.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.start_lock)?;
        if file.try_lock_exclusive().is_err() {
            debug!(path = %self.start_lock.display(), "start lock busy, waiting");
            file = tokio::task::spawn_blocking(move || {
                file.lock_exclusive()?;
                Ok::<_, std::io::Error>(file)
            })
            .await
            .map_err(|e| ReviewError::repository(format!("start lock wait failed: {}", e)))??;
        }
        debug!(path = %self.start_lock.display(), "start lock acquired");
        Ok(file)
    }
}

fn latest_live(sessions: &[ReviewSession], review_type: ReviewType) -> Option<&ReviewSession> {
    sessions
        .iter()
        .filter(|s| s.review_type() == review_type && s.status().is_live())
        .max_by_key(|s| s.started_at())
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
