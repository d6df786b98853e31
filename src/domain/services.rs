//! External services for the review aggregate.
//!
//! Services provide external dependencies (time, insights) to the aggregate
//! without coupling it to specific implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::domain::errors::ReviewError;
use crate::domain::insights::ReviewInsights;
use crate::domain::types::{ReviewType, TimestampUtc};

/// Source of the insights attached to a review when it is finalized.
#[async_trait]
pub trait InsightsProvider: Send + Sync {
    async fn insights_for(&self, review_type: ReviewType) -> Result<ReviewInsights, ReviewError>;
}

/// Services injected into the review aggregate for command handling.
#[derive(Clone)]
pub struct ReviewServices {
    pub clock: ReviewClock,
    pub insights: Arc<dyn InsightsProvider>,
}

impl ReviewServices {
    pub fn new(clock: ReviewClock, insights: Arc<dyn InsightsProvider>) -> Self {
        Self { clock, insights }
    }
}

impl fmt::Debug for ReviewServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewServices")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Clock service for timestamp generation.
///
/// A fixed clock is shared between clones, so advancing it in a test moves
/// time for the controller, the aggregate and the task store together.
#[derive(Debug, Clone, Default)]
pub struct ReviewClock {
    fixed: Option<Arc<Mutex<DateTime<Utc>>>>,
}

impl ReviewClock {
    pub fn system() -> Self {
        Self::default()
    }

    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self {
            fixed: Some(Arc::new(Mutex::new(at))),
        }
    }

    /// Returns the current UTC timestamp.
    pub fn now(&self) -> TimestampUtc {
        TimestampUtc(self.instant())
    }

    pub fn instant(&self) -> DateTime<Utc> {
        match &self.fixed {
            Some(fixed) => match fixed.lock() {
                Ok(at) => *at,
                Err(poisoned) => *poisoned.into_inner(),
            },
            None => Utc::now(),
        }
    }

    /// Moves a fixed clock forward. No effect on the system clock.
    pub fn advance(&self, by: Duration) {
        if let Some(fixed) = &self.fixed {
            let mut at = match fixed.lock() {
                Ok(at) => at,
                Err(poisoned) => poisoned.into_inner(),
            };
            *at += by;
        }
    }
}

/// Returns the same insights every time. Test-only.
#[cfg(test)]
pub(crate) struct FixedInsights(pub ReviewInsights);

#[cfg(test)]
#[async_trait]
impl InsightsProvider for FixedInsights {
    async fn insights_for(&self, review_type: ReviewType) -> Result<ReviewInsights, ReviewError> {
        Ok(ReviewInsights {
            window_days: review_type.window_days(),
            ..self.0.clone()
        })
    }
}

#[cfg(test)]
impl ReviewServices {
    pub(crate) fn for_tests(clock: ReviewClock) -> Self {
        Self::new(clock, Arc::new(FixedInsights(ReviewInsights::default())))
    }
}
