//! # kbqa-rag
//!
//! Retrieval engine for answering questions from a document knowledge base.
//!
//! ## Overview
//!
//! A query flows one way through the crate:
//!
//! ```text
//! question ─▶ EmbeddingProvider ─▶ Retriever (full scan, cosine, best chunk per source)
//!          ─▶ ContextAssembler (relevance floor) ─▶ TextGenerator ─▶ AnswerResult
//! ```
//!
//! - [`VectorStore`]: documents and embedded chunks ([`SqliteStore`], [`InMemoryVectorStore`])
//! - [`Retriever`]: brute-force similarity search with per-source deduplication
//! - [`ContextAssembler`]: score-thresholded prompt context
//! - [`RagPipeline`]: the `answer` / `search` surface, ingestion and statistics
//!
//! ## Features
//!
//! - `openai` – [`openai::OpenAIEmbeddingProvider`] for OpenAI-compatible embedding servers
//! - `gemini` – [`gemini::GeminiGenerator`] for Gemini / Gemma generation

pub mod chunking;
pub mod codec;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod similarity;
pub mod sqlite;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, MarkdownChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{AssembledContext, ContextAssembler};
pub use document::{AnswerResult, Document, FileFilter, NewChunk, SearchResult, StoredChunk};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider, embed_checked};
pub use error::{RagError, Result};
pub use generation::TextGenerator;
pub use ingest::Ingestor;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{KnowledgeBaseStats, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use similarity::cosine_similarity;
pub use sqlite::SqliteStore;
pub use vectorstore::{StoreStats, VectorStore};
