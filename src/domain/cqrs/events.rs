//! Review events for the CQRS aggregate.
//!
//! Events represent facts that have happened. They are the single source of truth
//! for review sessions and are persisted to the event log.

use crate::domain::catalog::StepDefinition;
use crate::domain::insights::ReviewInsights;
use crate::domain::step_data::StepPayload;
use crate::domain::types::{ReviewId, ReviewType, StepId, TimestampUtc, UserId};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

/// Events emitted by the review aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewEvent {
    ReviewStarted {
        review_id: ReviewId,
        user_id: UserId,
        review_type: ReviewType,
        steps: Vec<StepDefinition>,
        started_at: TimestampUtc,
    },

    /// Fields of `data` were written over the step's stored object.
    StepDataMerged {
        step_id: StepId,
        data: StepPayload,
        merged_at: TimestampUtc,
    },

    /// The step joined `completed_steps` for the first time.
    StepCompleted {
        step_id: StepId,
        completed_at: TimestampUtc,
    },

    StepAdvanced { from: usize, to: usize },

    StepRetreated { from: usize, to: usize },

    ReviewPaused { paused_at: TimestampUtc },

    ReviewResumed { resumed_at: TimestampUtc },

    ReviewAbandoned {
        reason: Option<String>,
        abandoned_at: TimestampUtc,
    },

    ReviewCompleted {
        notes: Option<String>,
        insights: ReviewInsights,
        completed_at: TimestampUtc,
    },
}

impl DomainEvent for ReviewEvent {
    fn event_type(&self) -> String {
        match self {
            Self::ReviewStarted { .. } => "ReviewStarted".to_string(),
            Self::StepDataMerged { .. } => "StepDataMerged".to_string(),
            Self::StepCompleted { .. } => "StepCompleted".to_string(),
            Self::StepAdvanced { .. } => "StepAdvanced".to_string(),
            Self::StepRetreated { .. } => "StepRetreated".to_string(),
            Self::ReviewPaused { .. } => "ReviewPaused".to_string(),
            Self::ReviewResumed { .. } => "ReviewResumed".to_string(),
            Self::ReviewAbandoned { .. } => "ReviewAbandoned".to_string(),
            Self::ReviewCompleted { .. } => "ReviewCompleted".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1".to_string()
    }
}
