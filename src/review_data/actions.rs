//! Task decisions made from inside a review step.
//!
//! The dispatcher only talks to the task repository and the aggregator. It
//! never sees a review session, so a failed action cannot mark anything as
//! processed in step data.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::errors::ReviewError;
use crate::domain::types::ReviewType;
use crate::review_data::aggregator::{ReviewDataAggregator, ReviewWorldView};
use crate::structured_logger::StructuredLogger;
use crate::tasks::{TaskFilter, TaskPatch, TaskRepository, TaskStatus};

pub struct TaskActionDispatcher {
    aggregator: Arc<ReviewDataAggregator>,
    review_type: ReviewType,
    audit: Option<Arc<StructuredLogger>>,
}

impl TaskActionDispatcher {
    /// `review_type` selects the view refreshed after each action.
    pub fn new(aggregator: Arc<ReviewDataAggregator>, review_type: ReviewType) -> Self {
        Self {
            aggregator,
            review_type,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<StructuredLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    fn repo(&self) -> &Arc<dyn TaskRepository> {
        self.aggregator.repository()
    }

    pub async fn complete(&self, task_id: &str) -> Result<ReviewWorldView, ReviewError> {
        let result = self
            .repo()
            .update(task_id, TaskPatch::status(TaskStatus::Completed))
            .await;
        self.finish("complete", task_id, result.map(|_| ())).await
    }

    /// Completes a task that was finished before it was recorded, so
    /// insights count it on the right day.
    pub async fn complete_at(
        &self,
        task_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ReviewWorldView, ReviewError> {
        let result = self
            .repo()
            .update(task_id, TaskPatch::status(TaskStatus::Completed).completed_at(at))
            .await;
        self.finish("complete", task_id, result.map(|_| ())).await
    }

    pub async fn convert_to_next_action(
        &self,
        task_id: &str,
        contexts: Vec<String>,
    ) -> Result<ReviewWorldView, ReviewError> {
        let mut patch = TaskPatch::status(TaskStatus::NextAction);
        if !contexts.is_empty() {
            patch = patch.with_contexts(contexts);
        }
        let result = self.repo().update(task_id, patch).await;
        self.finish("convert_to_next_action", task_id, result.map(|_| ()))
            .await
    }

    /// Creates an active project (named after the task unless `name` is
    /// given) and files the task as its first next action.
    pub async fn convert_to_project(
        &self,
        task_id: &str,
        name: Option<&str>,
    ) -> Result<ReviewWorldView, ReviewError> {
        let result = self.promote_to_project(task_id, name).await;
        self.finish("convert_to_project", task_id, result).await
    }

    async fn promote_to_project(&self, task_id: &str, name: Option<&str>) -> Result<(), ReviewError> {
        let task = self
            .repo()
            .list(TaskFilter::all())
            .await?
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ReviewError::not_found(format!("task {}", task_id)))?;

        let project = self
            .repo()
            .create_project(name.unwrap_or(&task.title))
            .await?;
        let patch =
            TaskPatch::status(TaskStatus::NextAction).with_project(Some(project.id.clone()));
        if let Err(err) = self.repo().update(task_id, patch).await {
            // Leave no empty project behind for a task that was never filed.
            if let Err(cleanup) = self.repo().delete_project(&project.id).await {
                warn!(project_id = %project.id, "failed to remove orphaned project: {}", cleanup);
            }
            return Err(err);
        }
        Ok(())
    }

    pub async fn defer_to_someday(&self, task_id: &str) -> Result<ReviewWorldView, ReviewError> {
        let result = self
            .repo()
            .update(task_id, TaskPatch::status(TaskStatus::Someday))
            .await;
        self.finish("defer_to_someday", task_id, result.map(|_| ()))
            .await
    }

    /// Moves the task to `project_id`, or out of any project with `None`.
    pub async fn reassign_project(
        &self,
        task_id: &str,
        project_id: Option<String>,
    ) -> Result<ReviewWorldView, ReviewError> {
        let result = self
            .repo()
            .update(task_id, TaskPatch::default().with_project(project_id))
            .await;
        self.finish("reassign_project", task_id, result.map(|_| ()))
            .await
    }

    pub async fn delete(&self, task_id: &str) -> Result<ReviewWorldView, ReviewError> {
        let result = self.repo().delete(task_id).await;
        self.finish("delete", task_id, result).await
    }

    /// Records the outcome, then refreshes the view on success.
    async fn finish(
        &self,
        action: &str,
        task_id: &str,
        result: Result<(), ReviewError>,
    ) -> Result<ReviewWorldView, ReviewError> {
        if let Some(audit) = &self.audit {
            audit.log_task_action(action, task_id, result.as_ref().map(|_| ()));
        }
        match result {
            Ok(()) => {
                info!(action, task_id, "task action applied");
                self.aggregator.load(self.review_type).await
            }
            Err(e) => {
                warn!(action, task_id, "task action failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
