use super::*;
use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

fn repo_in(dir: &tempfile::TempDir) -> JsonTaskRepository {
    let clock = ReviewClock::fixed(Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap());
    JsonTaskRepository::with_clock(dir.path().join("tasks.json"), clock)
}

#[tokio::test]
async fn test_missing_file_is_an_empty_store() {
    let dir = tempdir().unwrap();
    let repo = repo_in(&dir);
    assert!(repo.list(TaskFilter::all()).await.unwrap().is_empty());
    assert!(repo.projects(ProjectFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_capture_adds_inbox_items_that_survive_reopen() {
    let dir = tempdir().unwrap();
    let repo = repo_in(&dir);
    let task = repo
        .capture("  Renew passport ", vec!["errands".to_string()])
        .await
        .unwrap();
    assert_eq!(task.title, "Renew passport");
    assert_eq!(task.status, TaskStatus::Inbox);

    let reopened = repo_in(&dir);
    let inbox = reopened
        .list(TaskFilter::with_status(TaskStatus::Inbox))
        .await
        .unwrap();
    assert_eq!(inbox, vec![task]);
}

#[tokio::test]
async fn test_blank_title_is_rejected() {
    let dir = tempdir().unwrap();
    let err = repo_in(&dir).capture("   ", Vec::new()).await.unwrap_err();
    assert!(matches!(err, ReviewError::Validation { .. }));
}

#[tokio::test]
async fn test_update_completes_and_filters_by_completion_range() {
    let dir = tempdir().unwrap();
    let repo = repo_in(&dir);
    let task = repo.capture("Write report", Vec::new()).await.unwrap();

    let done = repo
        .update(&task.id, TaskPatch::status(TaskStatus::Completed))
        .await
        .unwrap();
    let completed_at = done.completed_at.unwrap();

    let hits = repo
        .list(TaskFilter::all().completed_between(
            completed_at - Duration::hours(1),
            completed_at + Duration::hours(1),
        ))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let misses = repo
        .list(TaskFilter::all().completed_between(
            completed_at + Duration::hours(1),
            completed_at + Duration::hours(2),
        ))
        .await
        .unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn test_assigning_unknown_project_is_not_found() {
    let dir = tempdir().unwrap();
    let repo = repo_in(&dir);
    let task = repo.capture("Plan trip", Vec::new()).await.unwrap();

    let err = repo
        .update(&task.id, TaskPatch::default().with_project(Some("nope".to_string())))
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotFound { .. }));

    let project = repo.create_project("Vacation").await.unwrap();
    let moved = repo
        .update(&task.id, TaskPatch::default().with_project(Some(project.id.clone())))
        .await
        .unwrap();
    assert_eq!(moved.project_id, Some(project.id.clone()));
    assert_eq!(
        repo.list(TaskFilter::all().in_project(project.id)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_delete_missing_task_is_not_found() {
    let dir = tempdir().unwrap();
    let repo = repo_in(&dir);
    let task = repo.capture("Old idea", Vec::new()).await.unwrap();

    repo.delete(&task.id).await.unwrap();
    assert!(matches!(
        repo.delete(&task.id).await,
        Err(ReviewError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_project_removes_only_that_project() {
    let dir = tempdir().unwrap();
    let repo = repo_in(&dir);
    let keep = repo.create_project("Garden").await.unwrap();
    let gone = repo.create_project("Garage").await.unwrap();

    repo.delete_project(&gone.id).await.unwrap();
    let left = repo.projects(ProjectFilter::default()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, keep.id);
    assert!(matches!(
        repo.delete_project(&gone.id).await,
        Err(ReviewError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_corrupt_file_is_a_repository_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("tasks.json"), "{ not json").unwrap();
    let err = repo_in(&dir).list(TaskFilter::all()).await.unwrap_err();
    assert!(err.is_retryable());
}
