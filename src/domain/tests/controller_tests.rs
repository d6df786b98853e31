//! End-to-end review scenarios over a file-backed event log and task store.

use super::*;
use crate::domain::errors::ReviewErrorKind;
use crate::domain::services::ReviewClock;
use crate::domain::step_data::{StepData, StepPayload};
use crate::domain::types::StepId;
use crate::review_data::ReviewDataAggregator;
use crate::review_paths::ReviewPaths;
use crate::tasks::{JsonTaskRepository, TaskPatch, TaskRepository, TaskStatus};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::{tempdir, TempDir};

const DAILY: [&str; 6] = [
    "welcome",
    "inbox_quick",
    "calendar_check",
    "planning",
    "quick_wins",
    "daily_reflection",
];

struct Fixture {
    _dir: TempDir,
    paths: ReviewPaths,
    clock: ReviewClock,
    repo: Arc<JsonTaskRepository>,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let paths = ReviewPaths::at(dir.path());
    // Friday 2026-03-06, 17:00 UTC.
    let clock = ReviewClock::fixed(Utc.with_ymd_and_hms(2026, 3, 6, 17, 0, 0).unwrap());
    let repo = Arc::new(JsonTaskRepository::with_clock(
        paths.tasks_path(),
        clock.clone(),
    ));
    Fixture {
        _dir: dir,
        paths,
        clock,
        repo,
    }
}

/// A fresh controller over the same files, like a second process would see.
fn controller(f: &Fixture) -> ReviewController {
    let user = UserId::from("alice");
    let store = FileEventStore::new(
        f.paths.review_log_path(&user).unwrap(),
        f.paths.snapshot_dir(&user).unwrap(),
        50,
    );
    let aggregator = Arc::new(ReviewDataAggregator::new(
        f.repo.clone(),
        Calendar::default(),
        5,
        f.clock.clone(),
    ));
    ReviewController::new(
        user.clone(),
        store,
        f.paths.start_lock_path(&user).unwrap(),
        StepCatalog::default(),
        ReviewServices::new(f.clock.clone(), aggregator),
        Calendar::default(),
    )
}

async fn finish_daily(handle: &ReviewHandle) -> ReviewSession {
    let mut last = None;
    for step in DAILY {
        last = Some(
            handle
                .complete_step(step, StepPayload::new())
                .await
                .expect("daily step failed"),
        );
    }
    last.expect("daily review has steps")
}

#[tokio::test]
async fn test_weekly_pause_and_resume_keeps_progress() {
    let f = fixture();
    let handle = controller(&f).start(ReviewType::Weekly).await.unwrap();
    let review_id = handle.id().clone();

    handle
        .complete_step("welcome", StepPayload::new())
        .await
        .unwrap();
    handle
        .complete_step(
            "inbox_process",
            StepPayload::new().with("processedItems", json!(["t1", "t2"])),
        )
        .await
        .unwrap();
    let paused = handle.pause().await.unwrap();
    assert_eq!(paused.status(), ReviewStatus::Paused);
    assert_eq!(paused.current_step(), 2);
    let saved = paused.session_data().clone();
    handle.close().await;

    // Later, from a new process.
    f.clock.advance(Duration::hours(3));
    let reopened = controller(&f).start(ReviewType::Weekly).await.unwrap();
    assert_eq!(reopened.id(), &review_id);
    assert_eq!(reopened.session().status(), ReviewStatus::Paused);

    let resumed = reopened.resume().await.unwrap();
    assert_eq!(resumed.status(), ReviewStatus::Active);
    assert_eq!(resumed.current_step(), 2);
    assert!(resumed.resumed_at().is_some());
    assert_eq!(resumed.session_data(), &saved);
    assert_eq!(resumed.completed_steps(), paused.completed_steps());

    match resumed.step_data(&StepId::from("inbox_process")).unwrap() {
        Some(StepData::InboxProcessing(data)) => {
            assert_eq!(data.processed_items, vec!["t1".to_string(), "t2".to_string()]);
        }
        other => panic!("unexpected step data: {:?}", other),
    }
    reopened.close().await;
}

#[tokio::test]
async fn test_daily_review_completes_with_insights() {
    let f = fixture();
    let task = f.repo.capture("Call plumber", vec!["calls".into()]).await.unwrap();
    f.repo
        .update(&task.id, TaskPatch::status(TaskStatus::Completed))
        .await
        .unwrap();

    let handle = controller(&f).start(ReviewType::Daily).await.unwrap();
    let done = finish_daily(&handle).await;

    assert_eq!(done.status(), ReviewStatus::Completed);
    assert_eq!(done.completed_steps().len(), 6);
    assert!(done.completed_at().is_some());
    let insights = done.insights().expect("insights attached");
    assert_eq!(insights.tasks_completed, 1);
    assert_eq!(insights.window_days, 1);
    assert_eq!(insights.top_contexts[0].context, "calls");
    handle.close().await;
}

#[tokio::test]
async fn test_start_twice_returns_the_same_review() {
    let f = fixture();
    let controller = controller(&f);
    let first = controller.start(ReviewType::Weekly).await.unwrap();
    let second = controller.start(ReviewType::Weekly).await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(controller.history().unwrap().len(), 1);
    first.close().await;
    second.close().await;
}

#[tokio::test]
async fn test_daily_and_weekly_are_independent() {
    let f = fixture();
    let controller = controller(&f);
    let daily = controller.start(ReviewType::Daily).await.unwrap();
    let weekly = controller.start(ReviewType::Weekly).await.unwrap();

    assert_ne!(daily.id(), weekly.id());
    assert_eq!(
        controller.live_session(ReviewType::Daily).unwrap().map(|s| s.id().clone()),
        Some(daily.id().clone())
    );
    daily.close().await;
    weekly.close().await;
}

#[tokio::test]
async fn test_abandon_then_start_creates_a_new_review() {
    let f = fixture();
    let controller = controller(&f);
    let handle = controller.start(ReviewType::Weekly).await.unwrap();
    let abandoned = handle.abandon(Some("sick".into())).await.unwrap();
    assert_eq!(abandoned.status(), ReviewStatus::Abandoned);
    assert!(abandoned.abandoned_at().is_some());
    handle.close().await;

    assert!(controller.live_session(ReviewType::Weekly).unwrap().is_none());
    let fresh = controller.start(ReviewType::Weekly).await.unwrap();
    assert_ne!(fresh.id(), abandoned.id());
    assert_eq!(fresh.session().current_step(), 0);

    let history = controller.history().unwrap();
    assert_eq!(history.len(), 2);
    fresh.close().await;
}

#[tokio::test]
async fn test_skipping_ahead_is_rejected_and_audited() {
    let f = fixture();
    let audit = Arc::new(
        StructuredLogger::new("alice", &f.paths.logs_dir(&UserId::from("alice")).unwrap())
            .unwrap(),
    );
    let controller = controller(&f).with_audit(audit.clone());
    let handle = controller.start(ReviewType::Daily).await.unwrap();
    handle.complete_step("welcome", StepPayload::new()).await.unwrap();
    let before = handle
        .complete_step("inbox_quick", StepPayload::new())
        .await
        .unwrap();
    assert_eq!(before.current_step_id(), Some(&StepId::from("calendar_check")));

    let err = handle
        .complete_step(
            "planning",
            StepPayload::new().with("priorities", json!(["ship"])),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ReviewErrorKind::Validation);

    let after = handle.reload().await.unwrap();
    assert_eq!(after.current_step(), 2);
    assert_eq!(after.version(), before.version());
    assert!(after.step_payload(&StepId::from("planning")).is_none());

    let audit_log = std::fs::read_to_string(audit.path()).unwrap();
    assert!(audit_log.contains("ReviewRejected"));
    handle.close().await;
}

#[tokio::test]
async fn test_resubmitting_an_earlier_step_merges_without_moving() {
    let f = fixture();
    let handle = controller(&f).start(ReviewType::Weekly).await.unwrap();
    handle.complete_step("welcome", StepPayload::new()).await.unwrap();
    handle
        .complete_step(
            "inbox_process",
            StepPayload::new()
                .with("processedItems", json!(["t1"]))
                .with("notes", "first pass"),
        )
        .await
        .unwrap();

    let merged = handle
        .complete_step(
            "inbox_process",
            StepPayload::new().with("processedItems", json!(["t1", "t3"])),
        )
        .await
        .unwrap();
    assert_eq!(merged.current_step(), 2);
    let payload = merged.step_payload(&StepId::from("inbox_process")).unwrap();
    assert_eq!(payload.get("processedItems"), Some(&json!(["t1", "t3"])));
    assert_eq!(payload.get("notes"), Some(&json!("first pass")));
    handle.close().await;
}

#[tokio::test]
async fn test_completed_review_blocks_restart_until_next_period() {
    let f = fixture();
    let controller = controller(&f);
    let handle = controller.start(ReviewType::Daily).await.unwrap();
    let done = finish_daily(&handle).await;
    handle.close().await;

    f.clock.advance(Duration::hours(2));
    let err = controller.start(ReviewType::Daily).await.unwrap_err();
    assert_eq!(err.kind(), ReviewErrorKind::AlreadyCompleted);
    assert_eq!(
        controller.last_completed(ReviewType::Daily).unwrap(),
        done.completed_at()
    );

    // Saturday 03:00 UTC is a new local day.
    f.clock.advance(Duration::hours(8));
    let next = controller.start(ReviewType::Daily).await.unwrap();
    assert_ne!(next.id(), done.id());
    next.close().await;
}

#[tokio::test]
async fn test_complete_with_notes_on_final_step() {
    let f = fixture();
    let handle = controller(&f).start(ReviewType::Daily).await.unwrap();
    for step in &DAILY[..5] {
        handle.complete_step(*step, StepPayload::new()).await.unwrap();
    }

    let back = handle.previous_step().await.unwrap();
    assert_eq!(back.current_step(), 4);
    handle
        .complete_step("quick_wins", StepPayload::new())
        .await
        .unwrap();

    let done = handle.complete(Some("good day".into())).await.unwrap();
    assert_eq!(done.status(), ReviewStatus::Completed);
    assert_eq!(done.notes(), Some("good day"));
    assert!(done.is_step_completed(&StepId::from("daily_reflection")));
    handle.close().await;
}

#[tokio::test]
async fn test_two_processes_conflict_on_stale_state() {
    let f = fixture();
    let tab_a = controller(&f).start(ReviewType::Weekly).await.unwrap();
    let tab_b = controller(&f).open(tab_a.id()).await.unwrap();

    tab_a.complete_step("welcome", StepPayload::new()).await.unwrap();
    let err = tab_b
        .complete_step("welcome", StepPayload::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ReviewErrorKind::ConcurrencyConflict);
    assert_eq!(tab_b.session().current_step(), 1);

    tab_a.close().await;
    tab_b.close().await;
}

#[tokio::test]
async fn test_start_waits_for_lock_without_blocking_runtime() {
    let f = fixture();
    let user = UserId::from("alice");
    let lock_path = f.paths.start_lock_path(&user).unwrap();
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let held = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .unwrap();
    held.lock_exclusive().unwrap();

    let controller = Arc::new(controller(&f));
    let waiting = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start(ReviewType::Weekly).await }
    });

    // The single-threaded test runtime keeps ticking while start waits.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!waiting.is_finished());
    assert!(controller.history().unwrap().is_empty());

    held.unlock().unwrap();
    let handle = tokio::time::timeout(std::time::Duration::from_secs(5), waiting)
        .await
        .expect("start still waiting after unlock")
        .expect("start task panicked")
        .unwrap();
    assert_eq!(controller.history().unwrap().len(), 1);
    handle.close().await;
}

#[tokio::test]
async fn test_open_unknown_review_is_not_found() {
    let f = fixture();
    let err = controller(&f).open(&ReviewId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ReviewErrorKind::NotFound);
}
