//! Review log persistence.

use std::fs;

use chrono::{TimeZone, Utc};
use kbqa_cli::{ReviewEntry, ReviewLog, ReviewStats, ReviewStatus, UserFeedback};
use kbqa_rag::{AnswerResult, SearchResult};

fn answer(question: &str, second: u32) -> AnswerResult {
    AnswerResult {
        question: question.to_string(),
        answer: "I don't have that information.".to_string(),
        search_results: vec![SearchResult::new("chunk", "guide.md", 0.42)],
        sources_found: 3,
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap(),
    }
}

#[test]
fn entries_from_answers_list_source_files() {
    let entry = ReviewEntry::from_answer(&answer("q", 7), UserFeedback::NotHelpful);
    assert_eq!(entry.timestamp, "2024-05-01T12:00:07.000000Z");
    assert_eq!(entry.sources, vec!["guide.md".to_string()]);
    assert_eq!(entry.status, ReviewStatus::Pending);
    assert!(entry.notes.is_empty());
}

#[test]
fn log_creates_parent_directories_and_appends() {
    let dir = tempfile::tempdir().unwrap();
    let log = ReviewLog::new(dir.path().join("deep/nested/log.json"));

    log.log(&ReviewEntry::from_answer(&answer("first", 1), UserFeedback::NotHelpful)).unwrap();
    log.log(&ReviewEntry::from_answer(&answer("second", 2), UserFeedback::Helpful)).unwrap();

    let entries = log.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].question, "first");
    assert_eq!(entries[1].question, "second");
    assert_eq!(fs::read_to_string(log.path()).unwrap().lines().count(), 2);
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.json");
    let good = serde_json::to_string(&ReviewEntry::from_answer(&answer("ok", 1), UserFeedback::None)).unwrap();
    fs::write(&path, format!("{{not json\n\n{good}\n[1,2,3]\n")).unwrap();

    let entries = ReviewLog::new(&path).entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].question, "ok");
}

#[test]
fn stats_count_statuses_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let log = ReviewLog::new(dir.path().join("log.json"));
    log.log(&ReviewEntry::from_answer(&answer("a", 1), UserFeedback::NotHelpful)).unwrap();
    log.log(&ReviewEntry::from_answer(&answer("b", 2), UserFeedback::Helpful)).unwrap();
    log.log(&ReviewEntry::from_answer(&answer("c", 3), UserFeedback::NotHelpful)).unwrap();

    assert!(log.update_status("2024-05-01T12:00:02.000000Z", ReviewStatus::Resolved).unwrap());

    assert_eq!(log.stats().unwrap(), ReviewStats { total: 3, pending: 2, user_reported: 2, resolved: 1 });
}

#[test]
fn update_status_without_match_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.json");
    let good = serde_json::to_string(&ReviewEntry::from_answer(&answer("ok", 1), UserFeedback::None)).unwrap();
    let contents = format!("garbage\n{good}\n");
    fs::write(&path, &contents).unwrap();

    let log = ReviewLog::new(&path);
    assert!(!log.update_status("never", ReviewStatus::Resolved).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), contents);
}

#[test]
fn export_writes_a_pretty_array() {
    let dir = tempfile::tempdir().unwrap();
    let log = ReviewLog::new(dir.path().join("log.json"));
    log.log(&ReviewEntry::from_answer(&answer("a", 1), UserFeedback::NotHelpful)).unwrap();

    let out = dir.path().join("export.json");
    assert_eq!(log.export_json(&out).unwrap(), 1);

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("[\n"));
    let parsed: Vec<ReviewEntry> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed[0].question, "a");
    assert_eq!(parsed[0].user_feedback, UserFeedback::NotHelpful);
}
