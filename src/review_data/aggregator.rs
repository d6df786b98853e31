//! Read-only world view a review step renders from.
//!
//! Nothing is cached: every [`ReviewDataAggregator::load`] re-queries the
//! task repository, so a view fetched after a task action reflects it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::ReviewError;
use crate::domain::insights::{InsightsCalculator, ReviewInsights};
use crate::domain::period::Calendar;
use crate::domain::services::{InsightsProvider, ReviewClock};
use crate::domain::types::ReviewType;
use crate::review_data::suggestions::{StalenessPolicy, Suggestion, SuggestionPolicy};
use crate::tasks::{Project, ProjectFilter, Task, TaskFilter, TaskRepository, TaskStatus};

/// How far back completions are read when computing the streak.
const STREAK_LOOKBACK_DAYS: i64 = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewWorldView {
    pub review_type: ReviewType,
    pub inbox_items: Vec<Task>,
    pub all_projects: Vec<Project>,
    pub someday_items: Vec<Task>,
    pub waiting_for: Vec<Task>,
    /// Completed inside the review's trailing window (today for daily).
    pub completed_this_week: Vec<Task>,
    pub insights: ReviewInsights,
    pub suggestions: Vec<Suggestion>,
    pub generated_at: DateTime<Utc>,
}

pub struct ReviewDataAggregator {
    repo: Arc<dyn TaskRepository>,
    calendar: Calendar,
    calculator: InsightsCalculator,
    clock: ReviewClock,
    policy: Arc<dyn SuggestionPolicy>,
}

impl ReviewDataAggregator {
    pub fn new(
        repo: Arc<dyn TaskRepository>,
        calendar: Calendar,
        top_contexts: usize,
        clock: ReviewClock,
    ) -> Self {
        Self {
            repo,
            calendar,
            calculator: InsightsCalculator::new(calendar, top_contexts),
            clock,
            policy: Arc::new(StalenessPolicy::default()),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn SuggestionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn repository(&self) -> &Arc<dyn TaskRepository> {
        &self.repo
    }

    pub async fn load(&self, review_type: ReviewType) -> Result<ReviewWorldView, ReviewError> {
        let now = self.clock.instant();
        let window = self.calendar.trailing_window(review_type, now);

        let (inbox_items, all_projects, someday_items, waiting_for, next_actions, history) =
            tokio::try_join!(
                self.repo.list(TaskFilter::with_status(TaskStatus::Inbox)),
                self.repo.projects(ProjectFilter::active()),
                self.repo.list(TaskFilter::with_status(TaskStatus::Someday)),
                self.repo.list(TaskFilter::with_status(TaskStatus::WaitingFor)),
                self.repo.list(TaskFilter::with_status(TaskStatus::NextAction)),
                self.completed_history(now),
            )?;

        let insights = self.calculator.calculate(&history, window.days, window.today);
        let completed_this_week: Vec<Task> = history
            .into_iter()
            .filter(|t| t.completed_at.is_some_and(|at| window.start <= at && at <= window.end))
            .collect();
        let suggestions = self.policy.rank(&next_actions, now);

        debug!(
            review_type = %review_type,
            inbox = inbox_items.len(),
            projects = all_projects.len(),
            completed = completed_this_week.len(),
            "loaded review world view"
        );

        Ok(ReviewWorldView {
            review_type,
            inbox_items,
            all_projects,
            someday_items,
            waiting_for,
            completed_this_week,
            insights,
            suggestions,
            generated_at: now,
        })
    }

    pub async fn insights(&self, review_type: ReviewType) -> Result<ReviewInsights, ReviewError> {
        let now = self.clock.instant();
        let window = self.calendar.trailing_window(review_type, now);
        let history = self.completed_history(now).await?;
        Ok(self.calculator.calculate(&history, window.days, window.today))
    }

    /// Completed tasks over the streak look-back, oldest completion first.
    async fn completed_history(&self, now: DateTime<Utc>) -> Result<Vec<Task>, ReviewError> {
        let from = now - Duration::days(STREAK_LOOKBACK_DAYS);
        let mut tasks = self
            .repo
            .list(TaskFilter::with_status(TaskStatus::Completed).completed_between(from, now))
            .await?;
        tasks.sort_by_key(|t| t.completed_at);
        Ok(tasks)
    }
}

#[async_trait]
impl InsightsProvider for ReviewDataAggregator {
    async fn insights_for(&self, review_type: ReviewType) -> Result<ReviewInsights, ReviewError> {
        self.insights(review_type).await
    }
}

#[cfg(test)]
#[path = "tests/aggregator_tests.rs"]
mod tests;
