//! The persisted state of one review, rebuilt by replaying its events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::catalog::StepDefinition;
use crate::domain::cqrs::ReviewEvent;
use crate::domain::errors::ReviewError;
use crate::domain::insights::ReviewInsights;
use crate::domain::step_data::{StepData, StepPayload};
use crate::domain::types::{ReviewId, ReviewStatus, ReviewType, StepId, TimestampUtc, UserId};

/// One in-progress or finished review.
///
/// Fields are private: the only way to change a session is to apply one of
/// its events, which keeps replayed and live sessions identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSession {
    id: ReviewId,
    user_id: UserId,
    #[serde(rename = "type")]
    review_type: ReviewType,
    status: ReviewStatus,
    current_step: usize,
    total_steps: usize,
    steps: Vec<StepDefinition>,
    completed_steps: Vec<StepId>,
    session_data: BTreeMap<StepId, StepPayload>,
    started_at: TimestampUtc,
    paused_at: Option<TimestampUtc>,
    resumed_at: Option<TimestampUtc>,
    completed_at: Option<TimestampUtc>,
    abandoned_at: Option<TimestampUtc>,
    abandon_reason: Option<String>,
    notes: Option<String>,
    insights: Option<ReviewInsights>,
    /// Number of events applied, equal to the last stored sequence.
    version: u64,
}

impl ReviewSession {
    /// Builds the session described by a `ReviewStarted` event.
    pub(crate) fn started(
        id: ReviewId,
        user_id: UserId,
        review_type: ReviewType,
        steps: Vec<StepDefinition>,
        started_at: TimestampUtc,
    ) -> Self {
        Self {
            id,
            user_id,
            review_type,
            status: ReviewStatus::Active,
            current_step: 0,
            total_steps: steps.len(),
            steps,
            completed_steps: Vec::new(),
            session_data: BTreeMap::new(),
            started_at,
            paused_at: None,
            resumed_at: None,
            completed_at: None,
            abandoned_at: None,
            abandon_reason: None,
            notes: None,
            insights: None,
            version: 1,
        }
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn review_type(&self) -> ReviewType {
        self.review_type
    }

    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn completed_steps(&self) -> &[StepId] {
        &self.completed_steps
    }

    pub fn session_data(&self) -> &BTreeMap<StepId, StepPayload> {
        &self.session_data
    }

    pub fn started_at(&self) -> TimestampUtc {
        self.started_at
    }

    pub fn paused_at(&self) -> Option<TimestampUtc> {
        self.paused_at
    }

    pub fn resumed_at(&self) -> Option<TimestampUtc> {
        self.resumed_at
    }

    pub fn completed_at(&self) -> Option<TimestampUtc> {
        self.completed_at
    }

    pub fn abandoned_at(&self) -> Option<TimestampUtc> {
        self.abandoned_at
    }

    pub fn abandon_reason(&self) -> Option<&str> {
        self.abandon_reason.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn insights(&self) -> Option<&ReviewInsights> {
        self.insights.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn current_step_def(&self) -> Option<&StepDefinition> {
        self.steps.get(self.current_step)
    }

    pub fn current_step_id(&self) -> Option<&StepId> {
        self.current_step_def().map(|s| &s.id)
    }

    pub fn step_index(&self, step_id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == step_id)
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step + 1 >= self.total_steps
    }

    pub fn is_step_completed(&self, step_id: &StepId) -> bool {
        self.completed_steps.contains(step_id)
    }

    pub fn step_payload(&self, step_id: &StepId) -> Option<&StepPayload> {
        self.session_data.get(step_id)
    }

    /// Typed view of a step's stored data.
    pub fn step_data(&self, step_id: &StepId) -> Result<Option<StepData>, ReviewError> {
        self.session_data
            .get(step_id)
            .map(|payload| StepData::parse(step_id, payload))
            .transpose()
    }

    /// Completed steps over total steps, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        let done = u32::try_from(self.completed_steps.len()).unwrap_or(u32::MAX);
        let total = u32::try_from(self.total_steps).unwrap_or(u32::MAX);
        f64::from(done) / f64::from(total)
    }

    /// Minutes still estimated for the steps not yet completed.
    pub fn remaining_minutes(&self) -> u32 {
        self.steps
            .iter()
            .filter(|s| !self.completed_steps.contains(&s.id))
            .map(|s| s.estimated_minutes)
            .sum()
    }

    pub(crate) fn apply(&mut self, event: &ReviewEvent) {
        match event {
            // Only meaningful on an uninitialized aggregate.
            ReviewEvent::ReviewStarted { .. } => return,
            ReviewEvent::StepDataMerged { step_id, data, .. } => {
                self.session_data
                    .entry(step_id.clone())
                    .or_default()
                    .merge(data);
            }
            ReviewEvent::StepCompleted { step_id, .. } => {
                if !self.completed_steps.contains(step_id) {
                    self.completed_steps.push(step_id.clone());
                }
            }
            ReviewEvent::StepAdvanced { to, .. } | ReviewEvent::StepRetreated { to, .. } => {
                self.current_step = *to;
            }
            ReviewEvent::ReviewPaused { paused_at } => {
                self.status = ReviewStatus::Paused;
                self.paused_at = Some(*paused_at);
            }
            ReviewEvent::ReviewResumed { resumed_at } => {
                self.status = ReviewStatus::Active;
                self.resumed_at = Some(*resumed_at);
            }
            ReviewEvent::ReviewAbandoned {
                reason,
                abandoned_at,
            } => {
                self.status = ReviewStatus::Abandoned;
                self.abandon_reason = reason.clone();
                self.abandoned_at = Some(*abandoned_at);
            }
            ReviewEvent::ReviewCompleted {
                notes,
                insights,
                completed_at,
            } => {
                self.status = ReviewStatus::Completed;
                self.notes = notes.clone();
                self.insights = Some(insights.clone());
                self.completed_at = Some(*completed_at);
            }
        }
        self.version += 1;
    }
}
