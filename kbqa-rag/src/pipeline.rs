//! Question-answering pipeline orchestrator.
//!
//! The [`RagPipeline`] sequences query embedding, retrieval, context assembly
//! and generation, and also exposes knowledge-base loading and statistics.
//!
//! # Example
//!
//! ```rust,ignore
//! use kbqa_rag::{HashEmbeddingProvider, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! pipeline.load_knowledge_base(true).await?;
//! let result = pipeline.answer("How do I configure X?", None::<&str>).await;
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, MarkdownChunker};
use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::document::{AnswerResult, FileFilter, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::ingest::Ingestor;
use crate::prompt::build_prompt;
use crate::retriever::Retriever;
use crate::sqlite::SqliteStore;
use crate::vectorstore::VectorStore;

/// Summary of what a knowledge base currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    /// Number of ingested documents.
    pub documents_loaded: usize,
    /// Number of stored chunks.
    pub total_chunks: usize,
    /// Location of the vector store.
    pub vector_database: String,
    /// Name of the configured embedding model.
    pub embedding_model: String,
    /// Dimensionality of the configured embedding model.
    pub embedding_dimension: usize,
}

/// The question-answering orchestrator.
///
/// Stateless per call: nothing carries between successive
/// [`answer`](Self::answer) invocations beyond the store's contents.
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    chunker: Arc<dyn Chunker>,
    retriever: Retriever,
    assembler: ContextAssembler,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Rank the best `top_k` sources for `query`. Never fails.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: impl Into<FileFilter>,
    ) -> Vec<SearchResult> {
        self.retriever.search(query, top_k, &filter.into()).await
    }

    /// Answer `question` from the knowledge base.
    ///
    /// Never fails. When the question cannot be embedded the answer text
    /// describes the error and no sources are returned. When generation fails
    /// the answer text describes the error and the retrieved sources are still
    /// returned.
    pub async fn answer(&self, question: &str, filter: impl Into<FileFilter>) -> AnswerResult {
        let filter = filter.into();
        info!(question_len = question.len(), filtered = !filter.is_any(), "processing question");

        let results = match self.retriever.try_search(question, self.config.top_k, &filter).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return AnswerResult {
                    question: question.to_string(),
                    answer: format!("Error processing question: {e}"),
                    search_results: Vec::new(),
                    sources_found: 0,
                    timestamp: Utc::now(),
                };
            }
        };

        let sources_found = results.len();
        let context = self.assembler.assemble(&results);
        if results.is_empty() {
            warn!("no relevant content found in knowledge base");
        } else if context.is_empty() {
            warn!(sources_found, "no highly relevant content found in knowledge base");
        } else {
            info!(sources_found, included = context.included.len(), "retrieved context");
        }

        let prompt = build_prompt(question, &context.text);
        let answer = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(generator = self.generator.name(), error = %e, "generation failed");
                format!("Error generating answer: {e}")
            }
        };

        AnswerResult {
            question: question.to_string(),
            answer,
            search_results: context.included,
            sources_found,
            timestamp: Utc::now(),
        }
    }

    /// Load the configured docs folder into the store, returning the chunk count.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if a document cannot be loaded.
    pub async fn load_knowledge_base(&self, overwrite: bool) -> Result<usize> {
        let ingestor = Ingestor::new(
            self.config.docs_dir.clone(),
            self.chunker.clone(),
            self.embedding_provider.clone(),
            self.vector_store.clone(),
        );
        let loaded = ingestor.load(overwrite).await?;
        if loaded == 0 {
            if overwrite {
                warn!("no documents reloaded; store unchanged");
            } else {
                info!("no new documents loaded; using existing store");
            }
        }
        Ok(loaded)
    }

    /// Load only documents not yet in the store.
    ///
    /// # Errors
    ///
    /// See [`load_knowledge_base`](Self::load_knowledge_base).
    pub async fn reload_knowledge_base(&self) -> Result<usize> {
        self.load_knowledge_base(false).await
    }

    /// Report document and chunk counts along with the embedding configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the store cannot be read.
    pub async fn statistics(&self) -> Result<KnowledgeBaseStats> {
        let stats = self.vector_store.stats().await.map_err(|e| {
            error!(error = %e, "failed to read store statistics");
            RagError::PipelineError(format!("failed to read statistics: {e}"))
        })?;

        Ok(KnowledgeBaseStats {
            documents_loaded: stats.documents,
            total_chunks: stats.chunks,
            vector_database: self.vector_store.location(),
            embedding_model: self.embedding_provider.model_name().to_string(),
            embedding_dimension: self.embedding_provider.dimensions(),
        })
    }
}

/// Assembles a [`RagPipeline`] from its capabilities.
///
/// `config`, `embedding_provider` and `generator` are required. The vector
/// store defaults to a [`SqliteStore`] at `config.store_path`, and the chunker
/// to a [`MarkdownChunker`] sized from the config.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn TextGenerator>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Used for both ingestion and questions.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Overrides the default [`SqliteStore`] at `config.store_path`.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Overrides the default [`MarkdownChunker`].
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// # Errors
    ///
    /// [`RagError::ConfigError`] when `config`, `embedding_provider` or
    /// `generator` was not supplied, or when the config fails
    /// [`RagConfig::validate`].
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let vector_store: Arc<dyn VectorStore> = match self.vector_store {
            Some(store) => store,
            None => Arc::new(SqliteStore::new(config.store_path.clone())),
        };
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(MarkdownChunker::new(config.chunk_size, config.chunk_overlap)),
        };

        let retriever = Retriever::new(vector_store.clone(), embedding_provider.clone());
        let assembler = ContextAssembler::new(config.relevance_floor);

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            generator,
            chunker,
            retriever,
            assembler,
        })
    }
}
