//! Error types for the `kbqa-rag` crate.

use thiserror::Error;

/// Every failure the retrieval engine can report.
///
/// Provider and backend variants carry the name of the component that failed
/// so a single log line identifies it.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding provider failed or returned an unusable vector.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    /// The text generator failed or returned no text.
    #[error("Generation error ({provider}): {message}")]
    GenerationError { provider: String, message: String },

    /// The store could not be opened, read, written, or held an undecodable row.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    /// Two vectors compared or stored together differ in length.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A document could not be read, embedded or written during loading.
    #[error("Ingestion error: {0}")]
    IngestionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RagError>;
