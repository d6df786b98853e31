//! Domain model for event-sourced review sessions.
//!
//! Review sessions change only through commands. Each command is validated
//! against the session's transition rules, turned into events, appended to
//! the user's event log, and the session is rebuilt by replaying them.
//!
//! # Architecture
//!
//! - **Commands / events** (`cqrs/`): intent and recorded facts
//! - **Session** (`session.rs`, `transitions.rs`): the replayed record and
//!   the rules deciding which commands it accepts
//! - **Actor** (`actor.rs`): one mailbox per open session, so mutations are
//!   applied strictly in order
//! - **Controller** (`controller.rs`): start, reopen and list reviews
//!
//! # Usage
//!
//! ```ignore
//! let handle = controller.start(ReviewType::Weekly).await?;
//! handle.complete_step("welcome", StepPayload::new()).await?;
//! handle.pause().await?;
//! ```

pub mod actor;
pub mod catalog;
pub mod controller;
pub mod cqrs;
pub mod errors;
pub mod insights;
pub mod period;
pub mod services;
pub mod session;
pub mod step_data;
pub mod transitions;
pub mod types;

// Re-export CQRS types
pub use cqrs::*;

pub use actor::{ReviewActor, ReviewActorArgs, ReviewHandle, ReviewMessage};
pub use catalog::{StepCatalog, StepDefinition};
pub use controller::ReviewController;
pub use errors::{ReviewError, ReviewErrorKind};
pub use insights::{ContextCount, InsightsCalculator, ReviewInsights};
pub use period::{Calendar, ReviewPeriod, ReviewWindow, WeekStart};
pub use services::{InsightsProvider, ReviewClock, ReviewServices};
pub use session::ReviewSession;
pub use step_data::{StepData, StepPayload};
pub use types::{ReviewId, ReviewStatus, ReviewType, StepId, TimestampUtc, UserId};
