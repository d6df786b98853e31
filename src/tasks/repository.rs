//! Task and project records plus the repository boundary the review
//! workflow reads from and writes through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::ReviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Inbox,
    NextAction,
    WaitingFor,
    Someday,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::NextAction => "next_action",
            TaskStatus::WaitingFor => "waiting_for",
            TaskStatus::Someday => "someday",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "inbox" => Ok(TaskStatus::Inbox),
            "next_action" | "next" => Ok(TaskStatus::NextAction),
            "waiting_for" | "waiting" => Ok(TaskStatus::WaitingFor),
            "someday" => Ok(TaskStatus::Someday),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(ReviewError::validation(format!(
                "unknown task status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Someday,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row filter for [`TaskRepository::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub project_id: Option<String>,
    /// Inclusive lower bound on `completed_at`.
    pub completed_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `completed_at`.
    pub completed_to: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn completed_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.completed_from = Some(from);
        self.completed_to = Some(to);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if let Some(project) = &self.project_id {
            if task.project_id.as_ref() != Some(project) {
                return false;
            }
        }
        if self.completed_from.is_some() || self.completed_to.is_some() {
            let Some(done) = task.completed_at else {
                return false;
            };
            if self.completed_from.is_some_and(|from| done < from) {
                return false;
            }
            if self.completed_to.is_some_and(|to| done > to) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
}

impl ProjectFilter {
    pub fn active() -> Self {
        Self {
            status: Some(ProjectStatus::Active),
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        match self.status {
            Some(status) => status == project.status,
            None => true,
        }
    }
}

/// Partial update for a task. `None` leaves the field untouched; the nested
/// `Option` on `project_id` distinguishes "unassign" from "keep".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub project_id: Option<Option<String>>,
    pub contexts: Option<Vec<String>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project_id: Option<String>) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = Some(contexts);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Applies the patch. Moving into `Completed` stamps `completed_at`
    /// (explicit value or `now`); moving out of it clears the stamp.
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(project_id) = &self.project_id {
            task.project_id = project_id.clone();
        }
        if let Some(contexts) = &self.contexts {
            task.contexts = contexts.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
            if status == TaskStatus::Completed {
                task.completed_at = Some(self.completed_at.unwrap_or(now));
            } else {
                task.completed_at = None;
            }
        } else if let Some(at) = self.completed_at {
            task.completed_at = Some(at);
        }
        task.updated_at = now;
    }
}

/// Task/project store consumed by the review workflow.
///
/// Implementations report missing records as [`ReviewError::NotFound`] and
/// I/O failures as [`ReviewError::Repository`].
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>, ReviewError>;

    async fn projects(&self, filter: ProjectFilter) -> Result<Vec<Project>, ReviewError>;

    async fn get_project(&self, id: &str) -> Result<Project, ReviewError>;

    async fn create_project(&self, name: &str) -> Result<Project, ReviewError>;

    /// Removes a project record. Tasks filed under it are left untouched.
    async fn delete_project(&self, id: &str) -> Result<(), ReviewError>;

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, ReviewError>;

    async fn delete(&self, id: &str) -> Result<(), ReviewError>;
}
