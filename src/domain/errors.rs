//! Error types for the review domain.

use cqrs_es::AggregateError;
use thiserror::Error;

use crate::domain::types::ReviewType;

/// Errors surfaced by review transitions, the review store and the task
/// repository boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    /// Out-of-order step completion, invalid step data, or a mutation of a
    /// session whose status does not allow it. Never reaches the store.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// A review of this type was already completed in the current period.
    #[error("{review_type} review already completed for this period (at {completed_at})")]
    AlreadyCompleted {
        review_type: ReviewType,
        completed_at: String,
    },

    /// The referenced review, task or project does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Persistence or task-store I/O failure.
    #[error("repository failure: {message}")]
    Repository { message: String },

    /// The session changed underneath the caller (another tab, another
    /// process). The caller should reload instead of retrying blindly.
    #[error("concurrency conflict: {message}")]
    ConcurrencyConflict { message: String },
}

/// Stable, payload-free classification of [`ReviewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewErrorKind {
    Validation,
    AlreadyCompleted,
    NotFound,
    Repository,
    ConcurrencyConflict,
}

impl ReviewError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ConcurrencyConflict {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn kind(&self) -> ReviewErrorKind {
        match self {
            Self::Validation { .. } => ReviewErrorKind::Validation,
            Self::AlreadyCompleted { .. } => ReviewErrorKind::AlreadyCompleted,
            Self::NotFound { .. } => ReviewErrorKind::NotFound,
            Self::Repository { .. } => ReviewErrorKind::Repository,
            Self::ConcurrencyConflict { .. } => ReviewErrorKind::ConcurrencyConflict,
        }
    }

    /// Repository failures leave the last persisted state intact, so the
    /// same call can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository { .. })
    }

    pub fn requires_reload(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl From<AggregateError<ReviewError>> for ReviewError {
    fn from(err: AggregateError<ReviewError>) -> Self {
        match err {
            AggregateError::UserError(err) => err,
            AggregateError::AggregateConflict => {
                ReviewError::conflict("review was modified concurrently")
            }
            other => ReviewError::repository(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ReviewError {
    fn from(err: std::io::Error) -> Self {
        ReviewError::repository(err.to_string())
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(err: serde_json::Error) -> Self {
        ReviewError::repository(format!("malformed record: {}", err))
    }
}
