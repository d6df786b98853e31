//! Guided GTD daily and weekly reviews.
//!
//! Review sessions are event-sourced per user (see [`domain`] and
//! [`event_store`]); the task data a review works from sits behind the
//! [`tasks::TaskRepository`] boundary and is assembled by [`review_data`].

pub mod app;
pub mod config;
pub mod domain;
pub mod event_store;
pub mod review_data;
pub mod review_paths;
pub mod structured_logger;
pub mod tasks;

/// Package version plus the git revision it was built from.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GTD_REVIEW_GIT_SHA"),
    ")"
);
