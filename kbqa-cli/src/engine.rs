//! Building a [`RagPipeline`] from command-line settings.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use kbqa_rag::gemini::GeminiGenerator;
use kbqa_rag::openai::OpenAIEmbeddingProvider;
use kbqa_rag::{
    EmbeddingProvider, HashEmbeddingProvider, RagConfig, RagError, RagPipeline, TextGenerator,
};
use tracing::debug;

use crate::cli::{EmbeddingBackend, EngineArgs};

/// Generator for commands that only retrieve; every call fails.
struct RetrievalOnly;

#[async_trait]
impl TextGenerator for RetrievalOnly {
    async fn generate(&self, _prompt: &str) -> kbqa_rag::Result<String> {
        Err(RagError::GenerationError {
            provider: "none".into(),
            message: "no generator configured for this command".into(),
        })
    }

    fn name(&self) -> &str {
        "none"
    }
}

impl EngineArgs {
    /// Validated engine configuration.
    pub fn config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .store_path(&self.db)
            .docs_dir(&self.docs)
            .top_k(self.top_k)
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .relevance_floor(self.relevance_floor)
            .build()
            .context("invalid knowledge-base configuration")
    }

    pub fn embedding_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.embedding {
            EmbeddingBackend::Hash => {
                let dimensions =
                    self.embedding_dimensions.unwrap_or(HashEmbeddingProvider::DEFAULT_DIMENSIONS);
                Ok(Arc::new(HashEmbeddingProvider::new(dimensions)))
            }
            EmbeddingBackend::Openai => {
                let mut provider = match &self.embedding_url {
                    Some(url) if std::env::var_os("OPENAI_API_KEY").is_none() => {
                        OpenAIEmbeddingProvider::local(url)
                    }
                    _ => OpenAIEmbeddingProvider::from_env()?,
                }
                .with_model(&self.embedding_model);
                if let Some(url) = &self.embedding_url {
                    provider = provider.with_base_url(url);
                }
                if let Some(dimensions) = self.embedding_dimensions {
                    provider = provider.with_dimensions(dimensions);
                }
                Ok(Arc::new(provider))
            }
        }
    }

    /// Gemini generator keyed from `GOOGLE_API_KEY`.
    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        let generator = GeminiGenerator::from_env()?.with_model(&self.model);
        Ok(Arc::new(generator))
    }

    /// Pipeline able to answer questions.
    pub fn answering_pipeline(&self) -> Result<RagPipeline> {
        self.pipeline(self.generator()?)
    }

    /// Pipeline for ingestion, search and statistics, which never generate.
    pub fn retrieval_pipeline(&self) -> Result<RagPipeline> {
        self.pipeline(Arc::new(RetrievalOnly))
    }

    fn pipeline(&self, generator: Arc<dyn TextGenerator>) -> Result<RagPipeline> {
        let config = self.config()?;
        debug!(?config, embedding = ?self.embedding, generator = generator.name(), "building pipeline");
        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(self.embedding_provider()?)
            .generator(generator)
            .build()?;
        Ok(pipeline)
    }
}
