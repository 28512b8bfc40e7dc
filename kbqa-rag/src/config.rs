//! Configuration for the retrieval engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Minimum similarity a result must exceed to be used as generation context.
pub const DEFAULT_RELEVANCE_FLOOR: f32 = 0.1;

/// Configuration parameters for one knowledge base.
///
/// Each [`RagPipeline`](crate::RagPipeline) owns its own copy, so several
/// knowledge bases with different stores can live in the same process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Location of the SQLite vector store.
    pub store_path: PathBuf,
    /// Folder scanned for markdown documents during ingestion.
    pub docs_dir: PathBuf,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Retrieval breadth: number of ranked sources requested per question.
    pub top_k: usize,
    /// Results must score strictly above this to be included in the context.
    pub relevance_floor: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("vector.db"),
            docs_dir: PathBuf::from("docs"),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            relevance_floor: DEFAULT_RELEVANCE_FLOOR,
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are mutually consistent.
    ///
    /// Configurations deserialised from files bypass the builder, so callers
    /// loading one should validate it before use.
    ///
    /// # Errors
    ///
    /// [`RagError::ConfigError`] when `chunk_overlap >= chunk_size`, when
    /// `top_k == 0`, or when `relevance_floor` lies outside `[-1, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be at least 1".to_string()));
        }
        if !(-1.0..=1.0).contains(&self.relevance_floor) {
            return Err(RagError::ConfigError(format!(
                "relevance_floor {} is outside the cosine range [-1, 1]",
                self.relevance_floor
            )));
        }
        Ok(())
    }
}

/// Fluent construction of a validated [`RagConfig`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    pub fn docs_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.docs_dir = path.into();
        self
    }

    pub fn chunk_size(mut self, chars: usize) -> Self {
        self.config.chunk_size = chars;
        self
    }

    pub fn chunk_overlap(mut self, chars: usize) -> Self {
        self.config.chunk_overlap = chars;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn relevance_floor(mut self, floor: f32) -> Self {
        self.config.relevance_floor = floor;
        self
    }

    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
