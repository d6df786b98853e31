//! Ordered step definitions for daily and weekly reviews.

use serde::{Deserialize, Serialize};

use crate::domain::types::{ReviewType, StepId};

/// One entry of a review checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub required: bool,
    pub estimated_minutes: u32,
}

impl StepDefinition {
    fn new(id: &str, required: bool, estimated_minutes: u32) -> Self {
        Self {
            id: StepId::from(id),
            required,
            estimated_minutes,
        }
    }
}

const DAILY_STEPS: &[(&str, bool, u32)] = &[
    ("welcome", true, 1),
    ("inbox_quick", true, 5),
    ("calendar_check", true, 3),
    ("planning", true, 5),
    ("quick_wins", false, 3),
    ("daily_reflection", false, 3),
];

const WEEKLY_STEPS: &[(&str, bool, u32)] = &[
    ("welcome", true, 2),
    ("inbox_process", true, 15),
    ("calendar_review", true, 10),
    ("next_actions_review", true, 10),
    ("waiting_for_review", true, 5),
    ("projects_review", true, 15),
    ("someday_review", false, 10),
    ("weekly_reflection", true, 5),
];

const GOALS_REVIEW: (&str, bool, u32) = ("goals_review", false, 10);

/// Read-only source of review checklists.
///
/// Sessions snapshot the list they were started with, so changing the
/// catalog (for example toggling the goals step) never touches a review
/// that is already in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCatalog {
    include_goals_review: bool,
}

impl StepCatalog {
    pub fn new(include_goals_review: bool) -> Self {
        Self {
            include_goals_review,
        }
    }

    pub fn steps_for(&self, review_type: ReviewType) -> Vec<StepDefinition> {
        let mut steps: Vec<StepDefinition> = match review_type {
            ReviewType::Daily => DAILY_STEPS,
            ReviewType::Weekly => WEEKLY_STEPS,
        }
        .iter()
        .map(|(id, required, minutes)| StepDefinition::new(id, *required, *minutes))
        .collect();

        if review_type == ReviewType::Weekly && self.include_goals_review {
            // Goes right before the closing reflection.
            let (id, required, minutes) = GOALS_REVIEW;
            let at = steps.len() - 1;
            steps.insert(at, StepDefinition::new(id, required, minutes));
        }

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(steps: &[StepDefinition]) -> Vec<&str> {
        steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn daily_review_has_six_ordered_steps() {
        let steps = StepCatalog::default().steps_for(ReviewType::Daily);
        assert_eq!(
            ids(&steps),
            vec![
                "welcome",
                "inbox_quick",
                "calendar_check",
                "planning",
                "quick_wins",
                "daily_reflection"
            ]
        );
    }

    #[test]
    fn weekly_review_has_eight_steps_by_default() {
        let steps = StepCatalog::default().steps_for(ReviewType::Weekly);
        assert_eq!(steps.len(), 8);
        assert_eq!(steps[0].id, "welcome");
        assert_eq!(steps[1].id, "inbox_process");
        assert_eq!(steps[7].id, "weekly_reflection");
    }

    #[test]
    fn goals_review_is_inserted_before_reflection() {
        let steps = StepCatalog::new(true).steps_for(ReviewType::Weekly);
        assert_eq!(steps.len(), 9);
        assert_eq!(steps[7].id, "goals_review");
        assert!(!steps[7].required);
        assert_eq!(steps[8].id, "weekly_reflection");
    }

    #[test]
    fn goals_flag_does_not_affect_daily() {
        let steps = StepCatalog::new(true).steps_for(ReviewType::Daily);
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn step_ids_are_unique_within_a_review() {
        for review_type in [ReviewType::Daily, ReviewType::Weekly] {
            let steps = StepCatalog::new(true).steps_for(review_type);
            let mut seen = std::collections::HashSet::new();
            assert!(steps.iter().all(|s| seen.insert(s.id.clone())));
        }
    }
}
