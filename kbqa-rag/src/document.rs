//! Data types for documents, chunks, search results and answers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier assigned by the store.
    pub id: i64,
    /// User-facing source label; also the per-source deduplication key.
    pub file_name: String,
    /// Number of chunks stored for this document.
    pub chunk_count: usize,
}

/// A chunk as read back from the store at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    /// Unique identifier assigned by the store.
    pub id: i64,
    /// Identifier of the owning [`Document`].
    pub document_id: i64,
    /// File name of the owning document.
    pub file_name: String,
    /// The chunk's text content.
    pub text: String,
    /// The decoded embedding; `embedding.len() == embedding_dim`.
    pub embedding: Vec<f32>,
    /// Dimensionality recorded alongside the embedding bytes.
    pub embedding_dim: usize,
}

/// A chunk produced by ingestion, ready to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    /// The chunk's text content.
    pub text: String,
    /// The chunk's embedding.
    pub embedding: Vec<f32>,
}

/// One ranked retrieval hit: the best chunk of a single source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The chunk text.
    pub text: String,
    /// The source file name.
    pub file_name: String,
    /// Cosine similarity with the query, in `[-1, 1]`.
    pub score: f32,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(text: impl Into<String>, file_name: impl Into<String>, score: f32) -> Self {
        Self { text: text.into(), file_name: file_name.into(), score }
    }

    /// The score expressed as a percentage.
    pub fn confidence_percent(&self) -> f32 {
        self.score * 100.0
    }

    /// The first `max_chars` characters of the text, with `...` appended when truncated.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }
}

/// The structured outcome of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// The question as asked.
    pub question: String,
    /// The generated answer, or a description of why no answer could be generated.
    pub answer: String,
    /// The results that cleared the relevance floor and were used as context.
    pub search_results: Vec<SearchResult>,
    /// Number of sources the retriever returned, before the relevance floor.
    pub sources_found: usize,
    /// When the answer was produced.
    pub timestamp: DateTime<Utc>,
}

/// Restricts search results to one or more named source documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFilter {
    /// No restriction.
    #[default]
    Any,
    /// Only results from this file.
    One(String),
    /// Only results from any of these files.
    AnyOf(BTreeSet<String>),
}

impl FileFilter {
    /// Whether a result from `file_name` passes the filter.
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::One(name) => name == file_name,
            Self::AnyOf(names) => names.contains(file_name),
        }
    }

    /// Whether this filter restricts anything.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl From<&str> for FileFilter {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for FileFilter {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for FileFilter {
    fn from(names: Vec<String>) -> Self {
        match names.len() {
            0 => Self::Any,
            1 => Self::One(names.into_iter().next().unwrap_or_default()),
            _ => Self::AnyOf(names.into_iter().collect()),
        }
    }
}

impl<T: Into<FileFilter>> From<Option<T>> for FileFilter {
    fn from(filter: Option<T>) -> Self {
        filter.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let result = SearchResult::new("héllo wörld", "a.md", 0.5);
        assert_eq!(result.preview(5), "héllo...");
        assert_eq!(result.preview(100), "héllo wörld");
    }

    #[test]
    fn confidence_is_a_percentage() {
        let result = SearchResult::new("x", "a.md", 0.8734);
        assert!((result.confidence_percent() - 87.34).abs() < 1e-3);
    }

    #[test]
    fn filter_conversions() {
        assert_eq!(FileFilter::from(None::<&str>), FileFilter::Any);
        assert_eq!(FileFilter::from(Some("a.md")), FileFilter::One("a.md".into()));
        assert_eq!(FileFilter::from(Vec::<String>::new()), FileFilter::Any);
        assert_eq!(FileFilter::from(vec!["a.md".to_string()]), FileFilter::One("a.md".into()));

        let many = FileFilter::from(vec!["a.md".to_string(), "b.md".to_string()]);
        assert!(many.matches("a.md"));
        assert!(many.matches("b.md"));
        assert!(!many.matches("c.md"));
    }
}
