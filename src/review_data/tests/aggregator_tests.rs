use super::*;
use crate::tasks::{JsonTaskRepository, TaskPatch};
use chrono::TimeZone;
use tempfile::tempdir;

struct Fixture {
    _dir: tempfile::TempDir,
    clock: ReviewClock,
    repo: Arc<JsonTaskRepository>,
    aggregator: ReviewDataAggregator,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    // Friday 2026-03-06, 17:00 UTC.
    let clock = ReviewClock::fixed(Utc.with_ymd_and_hms(2026, 3, 6, 17, 0, 0).unwrap());
    let repo = Arc::new(JsonTaskRepository::with_clock(
        dir.path().join("tasks.json"),
        clock.clone(),
    ));
    let aggregator =
        ReviewDataAggregator::new(repo.clone(), Calendar::default(), 5, clock.clone());
    Fixture {
        _dir: dir,
        clock,
        repo,
        aggregator,
    }
}

async fn completed(f: &Fixture, title: &str, days_ago: i64, context: &str) {
    let task = f.repo.capture(title, vec![context.to_string()]).await.unwrap();
    let at = f.clock.instant() - Duration::days(days_ago);
    f.repo
        .update(&task.id, TaskPatch::status(TaskStatus::Completed).completed_at(at))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_repository_yields_empty_view() {
    let f = fixture();
    let view = f.aggregator.load(ReviewType::Weekly).await.unwrap();

    assert!(view.inbox_items.is_empty());
    assert!(view.all_projects.is_empty());
    assert!(view.someday_items.is_empty());
    assert!(view.completed_this_week.is_empty());
    assert!(view.suggestions.is_empty());
    assert_eq!(view.insights.tasks_completed, 0);
    assert_eq!(view.insights.streak_days, 0);
    assert_eq!(view.generated_at, f.clock.instant());
}

#[tokio::test]
async fn test_view_groups_tasks_by_status() {
    let f = fixture();
    f.repo.capture("Inbox item", Vec::new()).await.unwrap();
    let someday = f.repo.capture("Learn cello", Vec::new()).await.unwrap();
    f.repo
        .update(&someday.id, TaskPatch::status(TaskStatus::Someday))
        .await
        .unwrap();
    let waiting = f.repo.capture("Quote from builder", Vec::new()).await.unwrap();
    f.repo
        .update(&waiting.id, TaskPatch::status(TaskStatus::WaitingFor))
        .await
        .unwrap();
    f.repo.create_project("Kitchen").await.unwrap();

    let view = f.aggregator.load(ReviewType::Weekly).await.unwrap();
    assert_eq!(view.inbox_items.len(), 1);
    assert_eq!(view.someday_items[0].id, someday.id);
    assert_eq!(view.waiting_for[0].id, waiting.id);
    assert_eq!(view.all_projects.len(), 1);
}

#[tokio::test]
async fn test_window_depends_on_review_type() {
    let f = fixture();
    completed(&f, "today", 0, "calls").await;
    completed(&f, "yesterday", 1, "calls").await;
    completed(&f, "last week", 8, "computer").await;

    let weekly = f.aggregator.load(ReviewType::Weekly).await.unwrap();
    assert_eq!(weekly.completed_this_week.len(), 2);
    assert_eq!(weekly.insights.tasks_completed, 2);
    assert_eq!(weekly.insights.streak_days, 2);
    assert_eq!(weekly.insights.top_contexts[0].context, "calls");

    let daily = f.aggregator.load(ReviewType::Daily).await.unwrap();
    assert_eq!(daily.completed_this_week.len(), 1);
    assert_eq!(daily.insights.avg_tasks_per_day, 1.0);
}

#[tokio::test]
async fn test_insights_provider_matches_view_insights() {
    let f = fixture();
    completed(&f, "done", 0, "home").await;

    let provided = f.aggregator.insights_for(ReviewType::Weekly).await.unwrap();
    let view = f.aggregator.load(ReviewType::Weekly).await.unwrap();
    assert_eq!(provided, view.insights);
}

#[tokio::test]
async fn test_repository_failure_is_propagated() {
    let f = fixture();
    std::fs::write(f.repo.path(), "garbage").unwrap();
    let err = f.aggregator.load(ReviewType::Daily).await.unwrap_err();
    assert!(matches!(err, ReviewError::Repository { .. }));
}
