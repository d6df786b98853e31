//! File-backed [`TaskRepository`] used by the CLI.
//!
//! The whole store is one JSON document rewritten atomically (temp file +
//! rename) on every mutation. A tokio mutex serializes mutations within the
//! process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::ReviewError;
use crate::domain::services::ReviewClock;
use crate::tasks::repository::{
    Project, ProjectFilter, ProjectStatus, Task, TaskFilter, TaskPatch, TaskRepository, TaskStatus,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskDocument {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    projects: Vec<Project>,
}

pub struct JsonTaskRepository {
    path: PathBuf,
    clock: ReviewClock,
    write_lock: Mutex<()>,
}

impl JsonTaskRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, ReviewClock::system())
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: ReviewClock) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a new inbox item.
    pub async fn capture(&self, title: &str, contexts: Vec<String>) -> Result<Task, ReviewError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ReviewError::validation("task title must not be empty"));
        }
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let now = self.clock.instant();
        let task = Task {
            id: new_id(),
            title: title.to_string(),
            status: TaskStatus::Inbox,
            project_id: None,
            contexts,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        doc.tasks.push(task.clone());
        self.write(&doc).await?;
        Ok(task)
    }

    async fn read(&self) -> Result<TaskDocument, ReviewError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(TaskDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, doc: &TaskDocument) -> Result<(), ReviewError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl TaskRepository for JsonTaskRepository {
    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>, ReviewError> {
        let doc = self.read().await?;
        Ok(doc.tasks.into_iter().filter(|t| filter.matches(t)).collect())
    }

    async fn projects(&self, filter: ProjectFilter) -> Result<Vec<Project>, ReviewError> {
        let doc = self.read().await?;
        Ok(doc
            .projects
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    async fn get_project(&self, id: &str) -> Result<Project, ReviewError> {
        self.read()
            .await?
            .projects
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ReviewError::not_found(format!("project {}", id)))
    }

    async fn create_project(&self, name: &str) -> Result<Project, ReviewError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReviewError::validation("project name must not be empty"));
        }
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let now = self.clock.instant();
        let project = Project {
            id: new_id(),
            name: name.to_string(),
            status: ProjectStatus::Active,
            created_at: now,
            updated_at: now,
        };
        doc.projects.push(project.clone());
        self.write(&doc).await?;
        Ok(project)
    }

    async fn delete_project(&self, id: &str) -> Result<(), ReviewError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let before = doc.projects.len();
        doc.projects.retain(|p| p.id != id);
        if doc.projects.len() == before {
            return Err(ReviewError::not_found(format!("project {}", id)));
        }
        self.write(&doc).await
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, ReviewError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;

        if let Some(Some(project_id)) = &patch.project_id {
            if !doc.projects.iter().any(|p| &p.id == project_id) {
                return Err(ReviewError::not_found(format!("project {}", project_id)));
            }
        }

        let now = self.clock.instant();
        let task = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ReviewError::not_found(format!("task {}", id)))?;
        patch.apply(task, now);
        let updated = task.clone();

        self.write(&doc).await?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), ReviewError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let before = doc.tasks.len();
        doc.tasks.retain(|t| t.id != id);
        if doc.tasks.len() == before {
            return Err(ReviewError::not_found(format!("task {}", id)));
        }
        self.write(&doc).await
    }
}

#[cfg(test)]
#[path = "tests/json_store_tests.rs"]
mod tests;
