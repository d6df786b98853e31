//! Wiring from CLI flags and config to the controller, store and task data.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ReviewConfig;
use crate::domain::{ReviewClock, ReviewController, ReviewServices, ReviewType, UserId};
use crate::event_store::FileEventStore;
use crate::review_data::{ReviewDataAggregator, TaskActionDispatcher};
use crate::review_paths::ReviewPaths;
use crate::structured_logger::StructuredLogger;
use crate::tasks::JsonTaskRepository;

/// Overrides taken from the global command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    pub home: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub user: Option<String>,
}

pub struct AppContext {
    pub config: ReviewConfig,
    pub paths: ReviewPaths,
    pub user: UserId,
    pub repo: Arc<JsonTaskRepository>,
    pub aggregator: Arc<ReviewDataAggregator>,
    pub controller: ReviewController,
    pub audit: Arc<StructuredLogger>,
}

impl AppContext {
    /// Resolves config and paths. `--home` beats `storage.data_dir`, which
    /// beats `~/.gtd-review`.
    pub fn load(options: &ContextOptions) -> Result<ReviewConfig> {
        let default_paths = match &options.home {
            Some(home) => ReviewPaths::at(home),
            None => ReviewPaths::from_home()?,
        };
        let config_path = options
            .config
            .clone()
            .unwrap_or_else(|| default_paths.config_path());
        ReviewConfig::load_or_default(&config_path)
    }

    pub fn build(options: &ContextOptions, config: ReviewConfig, clock: ReviewClock) -> Result<Self> {
        let paths = match (&options.home, &config.storage.data_dir) {
            (Some(home), _) => ReviewPaths::at(home),
            (None, Some(data_dir)) => ReviewPaths::at(data_dir),
            (None, None) => ReviewPaths::from_home()?,
        };
        let user = match &options.user {
            Some(user) if !user.trim().is_empty() => UserId::from(user.trim()),
            _ => config.user(),
        };
        let calendar = config.calendar()?;

        let audit = Arc::new(
            StructuredLogger::new(user.as_str(), &paths.logs_dir(&user)?)
                .context("Failed to open audit log")?,
        );
        let repo = Arc::new(JsonTaskRepository::with_clock(
            paths.tasks_path(),
            clock.clone(),
        ));
        let aggregator = Arc::new(ReviewDataAggregator::new(
            repo.clone(),
            calendar,
            config.insights.top_contexts,
            clock.clone(),
        ));
        let store = FileEventStore::new(
            paths.review_log_path(&user)?,
            paths.snapshot_dir(&user)?,
            config.storage.snapshot_every,
        );
        let controller = ReviewController::new(
            user.clone(),
            store,
            paths.start_lock_path(&user)?,
            config.catalog(),
            ReviewServices::new(clock, aggregator.clone()),
            calendar,
        )
        .with_audit(audit.clone());

        Ok(Self {
            config,
            paths,
            user,
            repo,
            aggregator,
            controller,
            audit,
        })
    }

    /// Dispatcher whose actions refresh the `review_type` view.
    pub fn dispatcher(&self, review_type: ReviewType) -> TaskActionDispatcher {
        TaskActionDispatcher::new(self.aggregator.clone(), review_type).with_audit(self.audit.clone())
    }
}
