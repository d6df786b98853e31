//! Per-step data captured during a review.
//!
//! Each step owns exactly one JSON object in the session. Writes are merged
//! shallowly into that object (field by field, last write wins) and then
//! validated against the step's typed shape. Steps this build does not know
//! about keep their raw object and round-trip untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::ReviewError;
use crate::domain::types::StepId;

/// Raw, persisted data object for one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepPayload(pub Map<String, Value>);

impl StepPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload from any JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self, ReviewError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ReviewError::validation(format!(
                "step data must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrites each field present in `patch`, leaving other fields alone.
    pub fn merge(&mut self, patch: &StepPayload) {
        for (field, value) in &patch.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WelcomeData {
    pub intention: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inbox triage (`inbox_quick`, `inbox_process`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InboxProcessingData {
    pub processed_items: Vec<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Calendar look-back/look-ahead (`calendar_check`, `calendar_review`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarData {
    pub reviewed: bool,
    pub follow_ups: Vec<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Walk through one list (next actions, waiting for, someday, quick wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListReviewData {
    pub reviewed_items: Vec<String>,
    pub flagged_items: Vec<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectsReviewData {
    pub reviewed_projects: Vec<String>,
    pub stalled_projects: Vec<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanningData {
    pub priorities: Vec<String>,
    pub time_blocks: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Closing reflection (`daily_reflection`, `weekly_reflection`, `goals_review`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReflectionData {
    pub wins: Vec<String>,
    pub lessons: Vec<String>,
    pub notes: Option<String>,
    pub energy_level: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of a step's data.
#[derive(Debug, Clone, PartialEq)]
pub enum StepData {
    Welcome(WelcomeData),
    InboxProcessing(InboxProcessingData),
    Calendar(CalendarData),
    ListReview(ListReviewData),
    ProjectsReview(ProjectsReviewData),
    Planning(PlanningData),
    Reflection(ReflectionData),
    Unknown(StepPayload),
}

impl StepData {
    /// Validates `payload` against the shape owned by `step`.
    pub fn parse(step: &StepId, payload: &StepPayload) -> Result<StepData, ReviewError> {
        let data = match step.as_str() {
            "welcome" => StepData::Welcome(typed(step, payload)?),
            "inbox_quick" | "inbox_process" => StepData::InboxProcessing(typed(step, payload)?),
            "calendar_check" | "calendar_review" => StepData::Calendar(typed(step, payload)?),
            "quick_wins" | "next_actions_review" | "waiting_for_review" | "someday_review" => {
                StepData::ListReview(typed(step, payload)?)
            }
            "projects_review" => StepData::ProjectsReview(typed(step, payload)?),
            "planning" => StepData::Planning(typed(step, payload)?),
            "daily_reflection" | "weekly_reflection" | "goals_review" => {
                StepData::Reflection(typed(step, payload)?)
            }
            _ => StepData::Unknown(payload.clone()),
        };
        Ok(data)
    }
}

fn typed<T: DeserializeOwned>(step: &StepId, payload: &StepPayload) -> Result<T, ReviewError> {
    serde_json::from_value(payload.to_value()).map_err(|e| {
        ReviewError::validation(format!("invalid data for step '{}': {}", step, e))
    })
}
