//! Transition rules for review sessions.
//!
//! Every command is checked here, both by the actor before it touches the
//! store and by the aggregate when the command is executed. Keeping the rules
//! in one place means a rejected call is always rejected for the same reason.

use crate::domain::cqrs::{ReviewCommand, ReviewEvent};
use crate::domain::errors::ReviewError;
use crate::domain::insights::ReviewInsights;
use crate::domain::session::ReviewSession;
use crate::domain::step_data::{StepData, StepPayload};
use crate::domain::types::{ReviewStatus, StepId, TimestampUtc};

/// Where a `CompleteStep` lands relative to the current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepTarget {
    /// The current step: merge, mark completed, advance or finalize.
    Current,
    /// An earlier, already visited step: merge only.
    Earlier,
}

impl ReviewSession {
    /// Validates `command` against the current state without producing events.
    pub fn check(&self, command: &ReviewCommand) -> Result<(), ReviewError> {
        match command {
            ReviewCommand::StartReview { .. } => Err(ReviewError::validation(format!(
                "review {} already started",
                self.id()
            ))),
            ReviewCommand::CompleteStep { step_id, data } => {
                self.step_target(step_id)?;
                self.validate_merge(step_id, data)
            }
            ReviewCommand::PreviousStep => {
                self.require_active("go back")?;
                if self.current_step() == 0 {
                    return Err(ReviewError::validation("already at the first step"));
                }
                Ok(())
            }
            ReviewCommand::Pause => self.require_transition(ReviewStatus::Paused),
            ReviewCommand::Resume => self.require_transition(ReviewStatus::Active),
            ReviewCommand::Abandon { .. } => self.require_transition(ReviewStatus::Abandoned),
            ReviewCommand::Complete { .. } => {
                self.require_active("complete")?;
                if !self.is_last_step() {
                    return Err(ReviewError::validation(format!(
                        "cannot complete on step {} of {}; finish the remaining steps first",
                        self.current_step() + 1,
                        self.total_steps()
                    )));
                }
                Ok(())
            }
        }
    }

    /// True when executing `command` would finalize the review, meaning the
    /// caller must supply insights to [`ReviewSession::decide`].
    pub fn finalizes(&self, command: &ReviewCommand) -> bool {
        match command {
            ReviewCommand::Complete { .. } => true,
            ReviewCommand::CompleteStep { step_id, .. } => {
                self.is_last_step()
                    && matches!(self.step_target(step_id), Ok(StepTarget::Current))
            }
            _ => false,
        }
    }

    /// Produces the events for `command`. `insights` is required when
    /// [`ReviewSession::finalizes`] is true and ignored otherwise.
    pub fn decide(
        &self,
        command: ReviewCommand,
        now: TimestampUtc,
        insights: Option<ReviewInsights>,
    ) -> Result<Vec<ReviewEvent>, ReviewError> {
        self.check(&command)?;

        let events = match command {
            ReviewCommand::StartReview { .. } => Vec::new(),
            ReviewCommand::CompleteStep { step_id, data } => {
                let target = self.step_target(&step_id)?;
                let mut events = Vec::new();
                if !data.is_empty() {
                    events.push(ReviewEvent::StepDataMerged {
                        step_id: step_id.clone(),
                        data,
                        merged_at: now,
                    });
                }
                if target == StepTarget::Current {
                    if !self.is_step_completed(&step_id) {
                        events.push(ReviewEvent::StepCompleted {
                            step_id,
                            completed_at: now,
                        });
                    }
                    if self.is_last_step() {
                        events.push(ReviewEvent::ReviewCompleted {
                            notes: None,
                            insights: require_insights(insights)?,
                            completed_at: now,
                        });
                    } else {
                        events.push(ReviewEvent::StepAdvanced {
                            from: self.current_step(),
                            to: self.current_step() + 1,
                        });
                    }
                }
                events
            }
            ReviewCommand::PreviousStep => vec![ReviewEvent::StepRetreated {
                from: self.current_step(),
                to: self.current_step() - 1,
            }],
            ReviewCommand::Pause => vec![ReviewEvent::ReviewPaused { paused_at: now }],
            ReviewCommand::Resume => vec![ReviewEvent::ReviewResumed { resumed_at: now }],
            ReviewCommand::Abandon { reason } => vec![ReviewEvent::ReviewAbandoned {
                reason,
                abandoned_at: now,
            }],
            ReviewCommand::Complete { notes } => {
                let mut events = Vec::new();
                if let Some(last) = self.current_step_id() {
                    if !self.is_step_completed(last) {
                        events.push(ReviewEvent::StepCompleted {
                            step_id: last.clone(),
                            completed_at: now,
                        });
                    }
                }
                events.push(ReviewEvent::ReviewCompleted {
                    notes,
                    insights: require_insights(insights)?,
                    completed_at: now,
                });
                events
            }
        };

        Ok(events)
    }

    fn step_target(&self, step_id: &StepId) -> Result<StepTarget, ReviewError> {
        self.require_active("complete a step")?;
        let index = self.step_index(step_id).ok_or_else(|| {
            ReviewError::validation(format!(
                "step '{}' is not part of this {} review",
                step_id,
                self.review_type()
            ))
        })?;

        if index == self.current_step() {
            Ok(StepTarget::Current)
        } else if index < self.current_step() {
            Ok(StepTarget::Earlier)
        } else {
            let current = self
                .current_step_id()
                .map(|s| s.to_string())
                .unwrap_or_default();
            Err(ReviewError::validation(format!(
                "step '{}' is ahead of the current step '{}'",
                step_id, current
            )))
        }
    }

    /// The merged result must still parse as the step's typed data.
    fn validate_merge(&self, step_id: &StepId, data: &StepPayload) -> Result<(), ReviewError> {
        let mut merged = self.step_payload(step_id).cloned().unwrap_or_default();
        merged.merge(data);
        StepData::parse(step_id, &merged).map(|_| ())
    }

    fn require_active(&self, action: &str) -> Result<(), ReviewError> {
        if self.status() != ReviewStatus::Active {
            return Err(ReviewError::validation(format!(
                "cannot {} while the review is {}",
                action,
                self.status()
            )));
        }
        Ok(())
    }

    fn require_transition(&self, next: ReviewStatus) -> Result<(), ReviewError> {
        if !self.status().can_transition_to(next) {
            return Err(ReviewError::validation(format!(
                "cannot move review from {} to {}",
                self.status(),
                next
            )));
        }
        Ok(())
    }
}

fn require_insights(insights: Option<ReviewInsights>) -> Result<ReviewInsights, ReviewError> {
    insights.ok_or_else(|| ReviewError::repository("insights were not computed for finalization"))
}

#[cfg(test)]
#[path = "tests/transitions_tests.rs"]
mod tests;
