//! Pluggable "what to do next" ranking.
//!
//! Only the contract is fixed: a policy turns candidate tasks into scored
//! suggestions, highest score first, each with human-readable reasons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tasks::{Task, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub task: Task,
    pub score: f64,
    pub reasons: Vec<String>,
}

pub trait SuggestionPolicy: Send + Sync {
    /// Ranks `candidates`, highest score first.
    fn rank(&self, candidates: &[Task], now: DateTime<Utc>) -> Vec<Suggestion>;
}

/// Ranks open next actions by how long they have gone untouched.
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    pub limit: usize,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

impl SuggestionPolicy for StalenessPolicy {
    fn rank(&self, candidates: &[Task], now: DateTime<Utc>) -> Vec<Suggestion> {
        let mut ranked: Vec<Suggestion> = candidates
            .iter()
            .filter(|t| t.status == TaskStatus::NextAction)
            .map(|task| {
                let idle_days = (now - task.updated_at).num_days().max(0);
                let mut reasons = vec![match idle_days {
                    0 => "touched today".to_string(),
                    1 => "untouched for 1 day".to_string(),
                    n => format!("untouched for {} days", n),
                }];
                if task.project_id.is_some() {
                    reasons.push("moves a project forward".to_string());
                }
                let project_bonus = if task.project_id.is_some() { 0.5 } else { 0.0 };
                Suggestion {
                    task: task.clone(),
                    score: idle_days as f64 + project_bonus,
                    reasons,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(self.limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn next_action(id: &str, idle: i64, project: Option<&str>, now: DateTime<Utc>) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            status: TaskStatus::NextAction,
            project_id: project.map(str::to_string),
            contexts: Vec::new(),
            created_at: now - Duration::days(idle),
            updated_at: now - Duration::days(idle),
            completed_at: None,
        }
    }

    #[test]
    fn test_stalest_next_action_ranks_first() {
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap();
        let mut inbox = next_action("inbox", 30, None, now);
        inbox.status = TaskStatus::Inbox;
        let tasks = vec![
            next_action("fresh", 0, None, now),
            next_action("stale", 10, None, now),
            next_action("project", 10, Some("p1"), now),
            inbox,
        ];

        let ranked = StalenessPolicy::default().rank(&tasks, now);
        let ids: Vec<&str> = ranked.iter().map(|s| s.task.id.as_str()).collect();
        assert_eq!(ids, vec!["project", "stale", "fresh"]);
        assert_eq!(ranked[1].reasons, vec!["untouched for 10 days".to_string()]);
        assert_eq!(ranked[2].reasons, vec!["touched today".to_string()]);
    }

    #[test]
    fn test_limit_truncates() {
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap();
        let tasks: Vec<Task> = (0..10)
            .map(|i| next_action(&i.to_string(), i, None, now))
            .collect();
        assert_eq!(StalenessPolicy { limit: 3 }.rank(&tasks, now).len(), 3);
    }
}
