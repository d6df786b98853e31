//! Review commands for the CQRS aggregate.
//!
//! Commands represent intent to change state. The aggregate validates commands
//! and produces events that are persisted to the event log.

use crate::domain::catalog::StepDefinition;
use crate::domain::step_data::StepPayload;
use crate::domain::types::{ReviewId, ReviewType, StepId, UserId};
use serde::{Deserialize, Serialize};

/// Commands that can be executed against the review aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCommand {
    /// Create the session with a snapshot of its checklist.
    StartReview {
        review_id: ReviewId,
        user_id: UserId,
        review_type: ReviewType,
        steps: Vec<StepDefinition>,
    },

    /// Merge data into a step and, when it is the current step, move on.
    CompleteStep { step_id: StepId, data: StepPayload },

    /// Navigate one step back without touching recorded answers.
    PreviousStep,

    Pause,

    Resume,

    /// Terminal. The session can never be resumed afterwards.
    Abandon { reason: Option<String> },

    /// Finalize from the last step, attaching insights and optional notes.
    Complete { notes: Option<String> },
}

impl ReviewCommand {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ReviewCommand::StartReview { .. } => "start_review",
            ReviewCommand::CompleteStep { .. } => "complete_step",
            ReviewCommand::PreviousStep => "previous_step",
            ReviewCommand::Pause => "pause",
            ReviewCommand::Resume => "resume",
            ReviewCommand::Abandon { .. } => "abandon",
            ReviewCommand::Complete { .. } => "complete",
        }
    }
}
