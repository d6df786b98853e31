//! Executes one parsed CLI command against an [`AppContext`].

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

use crate::app::cli::{Command, TaskCommand};
use crate::app::context::AppContext;
use crate::domain::{ReviewHandle, ReviewSession, ReviewType, StepPayload};
use crate::review_data::ReviewWorldView;
use crate::tasks::{Task, TaskFilter, TaskRepository};

/// Result of a command, printable either as text or as JSON.
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub json: Value,
}

impl Report {
    fn new(text: String, value: &impl Serialize) -> Result<Self> {
        Ok(Self {
            text,
            json: serde_json::to_value(value).context("Failed to serialize output")?,
        })
    }

    pub fn render(&self, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(&self.json)?)
        } else {
            Ok(self.text.clone())
        }
    }
}

pub async fn run(ctx: &AppContext, command: Command) -> Result<Report> {
    match command {
        Command::Start { review_type } => {
            let handle = ctx.controller.start(review_type).await?;
            let session = handle.session();
            handle.close().await;
            session_report(&session)
        }
        Command::Status { review_type } => {
            let handle = open_live(ctx, review_type).await?;
            let session = handle.reload().await;
            handle.close().await;
            session_report(&session?)
        }
        Command::Step {
            review_type,
            step_id,
            data,
        } => {
            let payload = match data {
                Some(raw) => {
                    let value: Value = serde_json::from_str(&raw)
                        .with_context(|| format!("--data is not valid JSON: {}", raw))?;
                    StepPayload::from_value(value)?
                }
                None => StepPayload::new(),
            };
            let handle = open_live(ctx, review_type).await?;
            let session = handle.complete_step(step_id.as_str(), payload).await;
            handle.close().await;
            session_report(&session?)
        }
        Command::Back { review_type } => {
            let handle = open_live(ctx, review_type).await?;
            let session = handle.previous_step().await;
            handle.close().await;
            session_report(&session?)
        }
        Command::Pause { review_type } => {
            let handle = open_live(ctx, review_type).await?;
            let session = handle.pause().await;
            handle.close().await;
            session_report(&session?)
        }
        Command::Resume { review_type } => {
            let handle = open_live(ctx, review_type).await?;
            let session = handle.resume().await;
            handle.close().await;
            session_report(&session?)
        }
        Command::Abandon {
            review_type,
            reason,
        } => {
            let handle = open_live(ctx, review_type).await?;
            let session = handle.abandon(reason).await;
            handle.close().await;
            session_report(&session?)
        }
        Command::Complete { review_type, notes } => {
            let handle = open_live(ctx, review_type).await?;
            let session = handle.complete(notes).await;
            handle.close().await;
            session_report(&session?)
        }
        Command::World { review_type } => {
            let view = ctx.aggregator.load(review_type).await?;
            Report::new(render_world(&view), &view)
        }
        Command::History => {
            let sessions = ctx.controller.history()?;
            let mut text = String::new();
            if sessions.is_empty() {
                text.push_str("No reviews yet.\n");
            }
            for s in &sessions {
                let _ = writeln!(
                    text,
                    "{}  {:<6} {:<9} {}  step {}/{}",
                    s.id(),
                    s.review_type().as_str(),
                    s.status().as_str(),
                    s.started_at(),
                    (s.current_step() + 1).min(s.total_steps()),
                    s.total_steps()
                );
            }
            Report::new(text, &sessions)
        }
        Command::Task(task) => run_task(ctx, task).await,
    }
}

async fn run_task(ctx: &AppContext, command: TaskCommand) -> Result<Report> {
    // Triage from the command line refreshes the widest view.
    let dispatcher = ctx.dispatcher(ReviewType::Weekly);
    let view = match command {
        TaskCommand::Add { title, contexts } => {
            let task = ctx.repo.capture(&title, contexts).await?;
            return Report::new(format!("Captured {}  {}\n", task.id, task.title), &task);
        }
        TaskCommand::List { status } => {
            let filter = match status {
                Some(status) => TaskFilter::with_status(status),
                None => TaskFilter::all(),
            };
            let tasks = ctx.repo.list(filter).await?;
            let mut text = String::new();
            for task in &tasks {
                text.push_str(&render_task(task));
            }
            return Report::new(text, &tasks);
        }
        TaskCommand::Done { id, at: None } => dispatcher.complete(&id).await?,
        TaskCommand::Done { id, at: Some(at) } => dispatcher.complete_at(&id, at).await?,
        TaskCommand::Next { id, contexts } => {
            dispatcher.convert_to_next_action(&id, contexts).await?
        }
        TaskCommand::Project { id, name } => {
            dispatcher.convert_to_project(&id, name.as_deref()).await?
        }
        TaskCommand::Someday { id } => dispatcher.defer_to_someday(&id).await?,
        TaskCommand::Delete { id } => dispatcher.delete(&id).await?,
        TaskCommand::Move { id, project } => dispatcher.reassign_project(&id, project).await?,
    };
    Report::new(render_world(&view), &view)
}

async fn open_live(ctx: &AppContext, review_type: ReviewType) -> Result<ReviewHandle> {
    let session = ctx.controller.live_session(review_type)?.with_context(|| {
        format!(
            "No {} review in progress; run `gtd-review start {}`",
            review_type, review_type
        )
    })?;
    Ok(ctx.controller.open(session.id()).await?)
}

fn session_report(session: &ReviewSession) -> Result<Report> {
    Report::new(render_session(session), session)
}

pub fn render_session(session: &ReviewSession) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} review {} ({})",
        session.review_type(),
        session.id(),
        session.status()
    );
    if let Some(step) = session.current_step_def() {
        let _ = writeln!(
            out,
            "  step {}/{}: {}{}",
            session.current_step() + 1,
            session.total_steps(),
            step.id,
            if step.required { "" } else { " (optional)" }
        );
    }
    let _ = writeln!(
        out,
        "  progress: {:.0}%, about {} min left",
        session.progress() * 100.0,
        session.remaining_minutes()
    );
    if let Some(reason) = session.abandon_reason() {
        let _ = writeln!(out, "  abandoned: {}", reason);
    }
    if let Some(insights) = session.insights() {
        let _ = writeln!(
            out,
            "  completed {} tasks over {} day(s), {:.1}/day, streak {} day(s)",
            insights.tasks_completed,
            insights.window_days,
            insights.avg_tasks_per_day,
            insights.streak_days
        );
        for ctx in &insights.top_contexts {
            let _ = writeln!(out, "    @{} x{}", ctx.context, ctx.count);
        }
    }
    if let Some(notes) = session.notes() {
        let _ = writeln!(out, "  notes: {}", notes);
    }
    out
}

pub fn render_world(view: &ReviewWorldView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} review data", view.review_type);
    let _ = writeln!(out, "  inbox:        {}", view.inbox_items.len());
    let _ = writeln!(out, "  projects:     {}", view.all_projects.len());
    let _ = writeln!(out, "  waiting for:  {}", view.waiting_for.len());
    let _ = writeln!(out, "  someday:      {}", view.someday_items.len());
    let _ = writeln!(out, "  completed:    {}", view.completed_this_week.len());
    if !view.suggestions.is_empty() {
        out.push_str("  stale next actions:\n");
        for suggestion in &view.suggestions {
            let _ = writeln!(
                out,
                "    {}  {} ({})",
                suggestion.task.id,
                suggestion.task.title,
                suggestion.reasons.join(", ")
            );
        }
    }
    out
}

fn render_task(task: &Task) -> String {
    let contexts: Vec<String> = task.contexts.iter().map(|c| format!("@{}", c)).collect();
    format!(
        "{}  [{}] {} {}\n",
        task.id,
        task.status,
        task.title,
        contexts.join(" ")
    )
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
