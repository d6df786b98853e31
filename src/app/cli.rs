use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::ReviewType;
use crate::tasks::TaskStatus;

#[derive(Parser, Debug)]
#[command(name = "gtd-review")]
#[command(about = "Guided daily and weekly GTD reviews over your task list")]
#[command(version = crate::VERSION)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage root (default ~/.gtd-review)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Config file (default <home>/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Print JSON instead of a text summary
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a review, or reopen the one already in progress
    Start { review_type: ReviewType },

    /// Show the live review of this type
    Status { review_type: ReviewType },

    /// Complete a step, merging optional JSON data into it
    Step {
        review_type: ReviewType,
        step_id: String,

        /// Step data as a JSON object, e.g. '{"processedItems":["t1"]}'
        #[arg(long)]
        data: Option<String>,
    },

    /// Go back one step
    Back { review_type: ReviewType },

    Pause { review_type: ReviewType },

    Resume { review_type: ReviewType },

    /// Give up on the live review
    Abandon {
        review_type: ReviewType,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Finish the review from its last step
    Complete {
        review_type: ReviewType,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show the task data a review of this type works from
    World { review_type: ReviewType },

    /// List past and current reviews, newest first
    History,

    /// Capture and triage tasks
    #[command(subcommand)]
    Task(TaskCommand),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Capture a new inbox item
    Add {
        title: String,
        #[arg(long = "context")]
        contexts: Vec<String>,
    },

    List {
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Mark a task completed
    Done {
        id: String,

        /// When it was actually done (RFC 3339), if not just now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Turn a task into a next action
    Next {
        id: String,
        #[arg(long = "context")]
        contexts: Vec<String>,
    },

    /// Turn a task into a project with itself as the first action
    Project {
        id: String,
        #[arg(long)]
        name: Option<String>,
    },

    Someday { id: String },

    Delete { id: String },

    /// Move a task into a project, or out of any project without --project
    Move {
        id: String,
        #[arg(long)]
        project: Option<String>,
    },
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
