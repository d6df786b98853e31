//! Productivity metrics attached to a review when it is finalized.
//!
//! [`InsightsCalculator`] is a pure function of the completed tasks it is
//! given and the window it is asked about. It does no I/O.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::period::Calendar;
use crate::tasks::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCount {
    pub context: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewInsights {
    pub tasks_completed: u32,
    pub projects_progressed: u32,
    pub avg_tasks_per_day: f64,
    pub top_contexts: Vec<ContextCount>,
    pub streak_days: u32,
    pub window_days: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct InsightsCalculator {
    calendar: Calendar,
    top_n: usize,
}

impl InsightsCalculator {
    pub fn new(calendar: Calendar, top_n: usize) -> Self {
        Self { calendar, top_n }
    }

    /// Computes insights for the `window_days` local days ending at `today`.
    ///
    /// Counts, contexts and projects only look at tasks completed inside the
    /// window. The streak looks at every task given, so callers that want
    /// streaks longer than the window pass a longer history.
    pub fn calculate(&self, completed: &[Task], window_days: u32, today: NaiveDate) -> ReviewInsights {
        let window_days = window_days.max(1);
        let first_day = today - Duration::days(i64::from(window_days) - 1);

        let mut completion_days = BTreeSet::new();
        let mut in_window = Vec::new();
        for task in completed {
            let Some(done) = task.completed_at else {
                continue;
            };
            let day = self.calendar.local_date(done);
            completion_days.insert(day);
            if first_day <= day && day <= today {
                in_window.push(task);
            }
        }

        let tasks_completed = u32::try_from(in_window.len()).unwrap_or(u32::MAX);
        let projects: HashSet<&str> = in_window
            .iter()
            .filter_map(|t| t.project_id.as_deref())
            .collect();

        ReviewInsights {
            tasks_completed,
            projects_progressed: u32::try_from(projects.len()).unwrap_or(u32::MAX),
            avg_tasks_per_day: f64::from(tasks_completed) / f64::from(window_days),
            top_contexts: rank_contexts(&in_window, self.top_n),
            streak_days: streak_ending(&completion_days, today),
            window_days,
        }
    }
}

/// Descending by count; ties keep first-seen order (stable sort).
fn rank_contexts(tasks: &[&Task], top_n: usize) -> Vec<ContextCount> {
    let mut ranked: Vec<ContextCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for task in tasks {
        for context in &task.contexts {
            match index.get(context.as_str()) {
                Some(&i) => ranked[i].count += 1,
                None => {
                    index.insert(context.as_str(), ranked.len());
                    ranked.push(ContextCount {
                        context: context.clone(),
                        count: 1,
                    });
                }
            }
        }
    }

    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}

fn streak_ending(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
#[path = "tests/insights_tests.rs"]
mod tests;
