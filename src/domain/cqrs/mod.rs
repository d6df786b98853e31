//! CQRS core types for event sourcing.
//!
//! This module contains the core CQRS types:
//! - **Commands**: Intent to change a review
//! - **Events**: Facts that have happened to a review
//! - **Aggregate**: Command validation and event application
//! - **Query**: Read-side fan-out of committed events

pub mod commands;
pub mod events;
pub mod query;

pub use commands::ReviewCommand;
pub use events::ReviewEvent;
pub use query::{ReviewEventEnvelope, ReviewQuery};

use crate::domain::errors::ReviewError;
use crate::domain::services::ReviewServices;
use crate::domain::session::ReviewSession;
use async_trait::async_trait;
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

/// Review aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum ReviewState {
    /// No `ReviewStarted` event has been applied yet.
    #[default]
    Uninitialized,
    /// Boxed for memory efficiency.
    Recorded(Box<ReviewSession>),
}

/// The review aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReviewAggregate {
    pub state: ReviewState,
}

impl ReviewAggregate {
    pub fn session(&self) -> Option<&ReviewSession> {
        match &self.state {
            ReviewState::Uninitialized => None,
            ReviewState::Recorded(session) => Some(session),
        }
    }

    pub fn into_session(self) -> Option<ReviewSession> {
        match self.state {
            ReviewState::Uninitialized => None,
            ReviewState::Recorded(session) => Some(*session),
        }
    }
}

#[async_trait]
impl Aggregate for ReviewAggregate {
    type Command = ReviewCommand;
    type Event = ReviewEvent;
    type Error = ReviewError;
    type Services = ReviewServices;

    fn aggregate_type() -> String {
        "review".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        let now = services.clock.now();

        match (&self.state, command) {
            (
                ReviewState::Uninitialized,
                ReviewCommand::StartReview {
                    review_id,
                    user_id,
                    review_type,
                    steps,
                },
            ) => {
                if steps.is_empty() {
                    return Err(ReviewError::validation(format!(
                        "a {} review needs at least one step",
                        review_type
                    )));
                }
                Ok(vec![ReviewEvent::ReviewStarted {
                    review_id,
                    user_id,
                    review_type,
                    steps,
                    started_at: now,
                }])
            }

            (ReviewState::Uninitialized, command) => Err(ReviewError::not_found(format!(
                "review for {} (no review has been started)",
                command.name()
            ))),

            (ReviewState::Recorded(session), command) => {
                session.check(&command)?;
                // Only the finalizing transition pays for the insights query.
                let insights = if session.finalizes(&command) {
                    Some(
                        services
                            .insights
                            .insights_for(session.review_type())
                            .await?,
                    )
                } else {
                    None
                };
                session.decide(command, now, insights)
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match (&mut self.state, event) {
            (
                ReviewState::Uninitialized,
                ReviewEvent::ReviewStarted {
                    review_id,
                    user_id,
                    review_type,
                    steps,
                    started_at,
                },
            ) => {
                self.state = ReviewState::Recorded(Box::new(ReviewSession::started(
                    review_id,
                    user_id,
                    review_type,
                    steps,
                    started_at,
                )));
            }
            (ReviewState::Recorded(session), event) => session.apply(&event),
            // Ignore events on wrong state (shouldn't happen with correct event sourcing)
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../tests/aggregate_tests.rs"]
mod tests;
