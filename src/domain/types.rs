//! Strongly typed domain primitives for the review aggregate.
//!
//! These newtypes give review identifiers, users, step identifiers and
//! timestamps their own types so they cannot be mixed up at call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::errors::ReviewError;

/// Unique identifier for a review session.
/// Used as the aggregate_id in the event store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    /// Creates a new random review ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a review ID from its string form.
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of a review session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a step inside a review checklist (e.g. `inbox_process`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of review checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    Daily,
    Weekly,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::Daily => "daily",
            ReviewType::Weekly => "weekly",
        }
    }

    /// Number of local calendar days covered by the review's data window.
    pub fn window_days(&self) -> u32 {
        match self {
            ReviewType::Daily => 1,
            ReviewType::Weekly => 7,
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewType {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReviewType::Daily),
            "weekly" => Ok(ReviewType::Weekly),
            other => Err(ReviewError::validation(format!(
                "unknown review type '{}' (expected daily or weekly)",
                other
            ))),
        }
    }
}

/// Lifecycle status of a review session.
///
/// `NotStarted` has no representation here: an uninitialized aggregate is
/// the not-started state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Active,
    Paused,
    Completed,
    Abandoned,
}

/// Every legal status change. Anything not listed here is rejected.
const TRANSITIONS: &[(ReviewStatus, ReviewStatus)] = &[
    (ReviewStatus::Active, ReviewStatus::Paused),
    (ReviewStatus::Paused, ReviewStatus::Active),
    (ReviewStatus::Active, ReviewStatus::Completed),
    (ReviewStatus::Active, ReviewStatus::Abandoned),
    (ReviewStatus::Paused, ReviewStatus::Abandoned),
];

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Active => "active",
            ReviewStatus::Paused => "paused",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Abandoned => "abandoned",
        }
    }

    /// Active or paused: the session still counts as the user's in-flight review.
    pub fn is_live(&self) -> bool {
        matches!(self, ReviewStatus::Active | ReviewStatus::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Completed | ReviewStatus::Abandoned)
    }

    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        TRANSITIONS.contains(&(*self, next))
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTC timestamp wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the timestamp as an RFC3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for TimestampUtc {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for TimestampUtc {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for TimestampUtc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}
