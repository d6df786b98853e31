use super::*;
use crate::domain::ReviewType;
use tempfile::tempdir;

#[test]
fn test_empty_yaml_uses_defaults() {
    let config: ReviewConfig = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.user_id, "local");
    assert_eq!(config.timezone, "UTC");
    assert_eq!(config.week_starts_on, WeekStart::Monday);
    assert!(!config.weekly.include_goals_review);
    assert_eq!(config.storage.snapshot_every, 50);
    assert_eq!(config.insights.top_contexts, 5);
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_yaml_parsing() {
    let yaml = r#"
user_id: alice
timezone: Europe/Berlin
week_starts_on: sunday
weekly:
  include_goals_review: true
storage:
  data_dir: /tmp/reviews
  snapshot_every: 0
insights:
  top_contexts: 3
logging:
  level: debug
"#;
    let config: ReviewConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.user(), UserId::from("alice"));
    assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Berlin);
    assert_eq!(config.week_starts_on, WeekStart::Sunday);
    assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/reviews")));
    assert_eq!(config.storage.snapshot_every, 0);
    assert_eq!(config.catalog().steps_for(ReviewType::Weekly).len(), 9);
}

#[test]
fn test_validation_rejects_unknown_timezone() {
    let config: ReviewConfig = serde_yaml::from_str("timezone: Mars/Olympus").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Mars/Olympus"));
}

#[test]
fn test_validation_rejects_zero_top_contexts() {
    let config: ReviewConfig = serde_yaml::from_str("insights:\n  top_contexts: 0\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = ReviewConfig::load_or_default(&dir.path().join("config.yaml")).unwrap();
    assert_eq!(config.user_id, "local");
}

#[test]
fn test_load_reports_parse_errors_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "week_starts_on: [not, a, day]").unwrap();
    let err = ReviewConfig::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("config.yaml"));
}
