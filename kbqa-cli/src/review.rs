//! Review log for answered questions.
//!
//! Entries are appended one JSON object per line so the file can be tailed
//! and edited by hand. Reads skip lines that fail to parse.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::SecondsFormat;
use kbqa_rag::AnswerResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default location of the review log.
pub const DEFAULT_REVIEW_LOG: &str = "question_logs.json";

/// Default target of [`ReviewLog::export_json`].
pub const DEFAULT_EXPORT_PATH: &str = "unanswered_questions.json";

/// Workflow state of a logged question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Resolved,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Resolved => f.write_str("resolved"),
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            other => bail!("unknown review status '{other}' (expected pending or resolved)"),
        }
    }
}

/// What the asker said about an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserFeedback {
    Helpful,
    NotHelpful,
    #[default]
    None,
}

/// One logged question and its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    /// RFC 3339 timestamp; also the key used by [`ReviewLog::update_status`].
    pub timestamp: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub user_feedback: UserFeedback,
}

impl ReviewEntry {
    /// Build a pending entry from an answer, listing its sources by file name.
    pub fn from_answer(result: &AnswerResult, feedback: UserFeedback) -> Self {
        Self {
            timestamp: result.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            question: result.question.clone(),
            answer: result.answer.clone(),
            sources: result.search_results.iter().map(|r| r.file_name.clone()).collect(),
            status: ReviewStatus::Pending,
            notes: String::new(),
            user_feedback: feedback,
        }
    }
}

/// Counts over the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total: usize,
    pub pending: usize,
    /// Entries the asker marked not helpful.
    pub user_reported: usize,
    pub resolved: usize,
}

/// A JSON-lines review log on disk.
#[derive(Debug, Clone)]
pub struct ReviewLog {
    path: PathBuf,
}

impl ReviewLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry`, creating the file and its parent directories if needed.
    pub fn log(&self, entry: &ReviewEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(entry).context("failed to serialize review entry")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write {}", self.path.display()))?;

        info!(path = %self.path.display(), feedback = ?entry.user_feedback, "logged question for review");
        Ok(())
    }

    /// Every parsable entry in file order. A missing log has no entries.
    pub fn entries(&self) -> Result<Vec<ReviewEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to open {}", self.path.display()));
            }
        };

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("failed to read {}", self.path.display()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ReviewEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = index + 1, error = %e, "skipping malformed review entry"),
            }
        }
        Ok(entries)
    }

    pub fn stats(&self) -> Result<ReviewStats> {
        let entries = self.entries()?;
        Ok(ReviewStats {
            total: entries.len(),
            pending: entries.iter().filter(|e| e.status == ReviewStatus::Pending).count(),
            user_reported: entries
                .iter()
                .filter(|e| e.user_feedback == UserFeedback::NotHelpful)
                .count(),
            resolved: entries.iter().filter(|e| e.status == ReviewStatus::Resolved).count(),
        })
    }

    /// Set the status of every entry logged at `timestamp`.
    ///
    /// Returns `false`, leaving the file untouched, when no entry matches.
    /// Malformed lines are dropped when the file is rewritten.
    pub fn update_status(&self, timestamp: &str, status: ReviewStatus) -> Result<bool> {
        let mut entries = self.entries()?;
        let mut updated = false;
        for entry in entries.iter_mut().filter(|e| e.timestamp == timestamp) {
            entry.status = status;
            updated = true;
        }
        if !updated {
            debug!(timestamp, "no review entry with this timestamp");
            return Ok(false);
        }

        let mut contents = String::new();
        for entry in &entries {
            contents.push_str(&serde_json::to_string(entry).context("failed to serialize review entry")?);
            contents.push('\n');
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to rewrite {}", self.path.display()))?;
        info!(timestamp, %status, "review status updated");
        Ok(true)
    }

    /// Write every entry to `out` as a pretty-printed JSON array.
    pub fn export_json(&self, out: impl AsRef<Path>) -> Result<usize> {
        let out = out.as_ref();
        let entries = self.entries()?;
        let json = serde_json::to_string_pretty(&entries).context("failed to serialize review log")?;
        fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(timestamp: &str, feedback: UserFeedback) -> ReviewEntry {
        ReviewEntry {
            timestamp: timestamp.to_string(),
            question: "How do I convert QUALIFY?".to_string(),
            answer: "Use a window function.".to_string(),
            sources: vec!["guide.md".to_string()],
            status: ReviewStatus::Pending,
            notes: String::new(),
            user_feedback: feedback,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Resolved".parse::<ReviewStatus>().unwrap(), ReviewStatus::Resolved);
        assert_eq!(" pending ".parse::<ReviewStatus>().unwrap(), ReviewStatus::Pending);
        assert!("done".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn serialises_with_snake_case_strings() {
        let json = serde_json::to_value(entry("t1", UserFeedback::NotHelpful)).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["user_feedback"], "not_helpful");
    }

    #[test]
    fn older_entries_without_feedback_still_parse() {
        let line = r#"{"timestamp":"t","question":"q","answer":"a","sources":[],"status":"resolved","notes":""}"#;
        let parsed: ReviewEntry = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.user_feedback, UserFeedback::None);
        assert_eq!(parsed.status, ReviewStatus::Resolved);
    }

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReviewLog::new(dir.path().join("absent.json"));
        assert!(log.entries().unwrap().is_empty());
        assert_eq!(log.stats().unwrap(), ReviewStats::default());
    }
}
