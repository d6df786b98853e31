use crate::domain::period::{Calendar, WeekStart};
use crate::domain::{StepCatalog, UserId};
use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReviewConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// IANA time zone name used for review periods and insight windows.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub week_starts_on: WeekStart,
    #[serde(default)]
    pub weekly: WeeklyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeeklyConfig {
    /// Adds the optional `goals_review` step before the weekly reflection.
    #[serde(default)]
    pub include_goals_review: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Overrides the storage root (default `~/.gtd-review/`).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Snapshot every N events per review. 0 disables snapshots.
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            snapshot_every: default_snapshot_every(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InsightsConfig {
    #[serde(default = "default_top_contexts")]
    pub top_contexts: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            top_contexts: default_top_contexts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_snapshot_every() -> u64 {
    50
}

fn default_top_contexts() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            timezone: default_timezone(),
            week_starts_on: WeekStart::default(),
            weekly: WeeklyConfig::default(),
            storage: StorageConfig::default(),
            insights: InsightsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ReviewConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`ReviewConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            anyhow::bail!("user_id must not be empty");
        }
        self.timezone()?;
        if self.insights.top_contexts == 0 {
            anyhow::bail!("insights.top_contexts must be at least 1");
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {}", self.timezone, e))
    }

    pub fn calendar(&self) -> Result<Calendar> {
        Ok(Calendar::new(self.timezone()?, self.week_starts_on))
    }

    pub fn catalog(&self) -> StepCatalog {
        StepCatalog::new(self.weekly.include_goals_review)
    }

    pub fn user(&self) -> UserId {
        UserId::from(self.user_id.trim())
    }
}

#[cfg(test)]
#[path = "tests/config_tests/config_tests.rs"]
mod tests;
