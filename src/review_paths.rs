//! Storage paths for all review persistence.
//!
//! Everything lives under one root (default `~/.gtd-review/`):
//! - `config.yaml` - User configuration
//! - `tasks.json` - Reference task/project store used by the CLI
//! - `users/<user-hash>/reviews.jsonl` - Review event log
//! - `users/<user-hash>/snapshots/` - Per-review aggregate snapshots
//! - `users/<user-hash>/start.lock` - Serializes review creation
//! - `users/<user-hash>/logs/audit.jsonl` - Structured audit log

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::UserId;

/// The name of the review home directory.
const REVIEW_HOME_DIR: &str = ".gtd-review";

/// Resolved storage layout. Passed explicitly to everything that touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPaths {
    root: PathBuf,
}

impl ReviewPaths {
    /// Uses `~/.gtd-review/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory for review storage")?;
        Ok(Self::at(home.join(REVIEW_HOME_DIR)))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    /// Returns `<root>/users/<user-hash>/`, creating it if needed.
    pub fn user_dir(&self, user: &UserId) -> Result<PathBuf> {
        let dir = self.root.join("users").join(user_hash(user));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create user directory: {}", dir.display()))?;
        Ok(dir)
    }

    pub fn review_log_path(&self, user: &UserId) -> Result<PathBuf> {
        Ok(self.user_dir(user)?.join("reviews.jsonl"))
    }

    pub fn snapshot_dir(&self, user: &UserId) -> Result<PathBuf> {
        Ok(self.user_dir(user)?.join("snapshots"))
    }

    pub fn start_lock_path(&self, user: &UserId) -> Result<PathBuf> {
        Ok(self.user_dir(user)?.join("start.lock"))
    }

    /// Returns the logs directory for a user, creating it if needed.
    pub fn logs_dir(&self, user: &UserId) -> Result<PathBuf> {
        let dir = self.user_dir(user)?.join("logs");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
        Ok(dir)
    }
}

/// SHA-256 of the user id, truncated to 12 hex characters.
pub fn user_hash(user: &UserId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_str().as_bytes());
    let result = hasher.finalize();
    hex_encode(&result[..6])
}

/// Encodes bytes as lowercase hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
