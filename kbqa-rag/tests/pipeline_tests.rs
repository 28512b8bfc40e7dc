//! End-to-end answer behaviour, including failure handling and ingestion.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kbqa_rag::{
    EmbeddingProvider, FileFilter, HashEmbeddingProvider, InMemoryVectorStore, NewChunk,
    RagConfig, RagError, RagPipeline, SqliteStore, TextGenerator, VectorStore,
};

/// Records prompts and answers with a canned reply, or fails on demand.
struct ScriptedGenerator {
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn ok() -> Arc<Self> {
        Arc::new(Self { fail: false, prompts: Mutex::new(Vec::new()) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, prompts: Mutex::new(Vec::new()) })
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> kbqa_rag::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(RagError::GenerationError {
                provider: "scripted".into(),
                message: "quota exceeded".into(),
            });
        }
        Ok("Generated answer.".to_string())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct BrokenEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for BrokenEmbeddingProvider {
    async fn embed(&self, _text: &str) -> kbqa_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingError { provider: "broken".into(), message: "model offline".into() })
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

/// Advertises the OpenAI default width but answers like a small local model.
struct NarrowEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for NarrowEmbeddingProvider {
    async fn embed(&self, _text: &str) -> kbqa_rag::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        1536
    }

    fn model_name(&self) -> &str {
        "narrow"
    }
}

async fn populated_store(provider: &HashEmbeddingProvider) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    for (file, text) in [
        ("guide.md", "Setup is easy: install the package and run the setup command."),
        ("other.md", "Bananas are a tropical fruit."),
    ] {
        let embedding = provider.embed(text).await.unwrap();
        store.replace_document(file, &[NewChunk { text: text.to_string(), embedding }]).await.unwrap();
    }
    store
}

fn pipeline(
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(provider)
        .vector_store(store)
        .generator(generator)
        .build()
        .unwrap()
}

#[tokio::test]
async fn answer_uses_relevant_sources_as_context() {
    let provider = Arc::new(HashEmbeddingProvider::default());
    let store = populated_store(&provider).await;
    let generator = ScriptedGenerator::ok();
    let pipeline = pipeline(store, provider, generator.clone());

    let result = pipeline.answer("how do I run the setup command", None::<&str>).await;

    assert_eq!(result.answer, "Generated answer.");
    assert_eq!(result.sources_found, 2);
    assert_eq!(result.search_results[0].file_name, "guide.md");
    assert!(result.search_results.iter().all(|r| r.score > 0.1));
    let prompt = generator.last_prompt();
    assert!(prompt.contains("KNOWLEDGE BASE CONTENT:"));
    assert!(prompt.contains("[From guide.md (confidence: "));
}

#[tokio::test]
async fn empty_store_answers_without_context() {
    let generator = ScriptedGenerator::ok();
    let pipeline = pipeline(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(HashEmbeddingProvider::default()),
        generator.clone(),
    );

    let result = pipeline.answer("anything at all", FileFilter::Any).await;

    assert_eq!(result.sources_found, 0);
    assert!(result.search_results.is_empty());
    assert!(!result.answer.is_empty());
    assert!(!generator.last_prompt().contains("KNOWLEDGE BASE"));
}

#[tokio::test]
async fn sources_below_floor_are_counted_but_not_used() {
    let provider = Arc::new(HashEmbeddingProvider::default());
    let store = populated_store(&provider).await;
    let generator = ScriptedGenerator::ok();
    let pipeline = RagPipeline::builder()
        .config(RagConfig { relevance_floor: 0.99, ..RagConfig::default() })
        .embedding_provider(provider)
        .vector_store(store)
        .generator(generator.clone())
        .build()
        .unwrap();

    let result = pipeline.answer("how do I run the setup command", None::<&str>).await;

    assert_eq!(result.sources_found, 2);
    assert!(result.search_results.is_empty());
    assert_eq!(result.answer, "Generated answer.");
    assert!(!generator.last_prompt().contains("KNOWLEDGE BASE"));
}

#[test]
fn builder_rejects_invalid_config() {
    let err = RagPipeline::builder()
        .config(RagConfig { top_k: 0, ..RagConfig::default() })
        .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generator(ScriptedGenerator::ok())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, RagError::ConfigError(_)));
}

#[tokio::test]
async fn generation_failure_keeps_sources() {
    let provider = Arc::new(HashEmbeddingProvider::default());
    let store = populated_store(&provider).await;
    let pipeline = pipeline(store, provider, ScriptedGenerator::failing());

    let result = pipeline.answer("how do I run the setup command", None::<&str>).await;

    assert!(result.answer.contains("Error generating answer"));
    assert!(result.answer.contains("quota exceeded"));
    assert!(!result.search_results.is_empty());
}

#[tokio::test]
async fn embedding_failure_reports_error_with_no_sources() {
    let generator = ScriptedGenerator::ok();
    let provider = HashEmbeddingProvider::default();
    let store = populated_store(&provider).await;
    let pipeline = pipeline(store, Arc::new(BrokenEmbeddingProvider), generator.clone());

    let result = pipeline.answer("how do I run the setup command", None::<&str>).await;

    assert!(result.answer.contains("Error processing question"));
    assert_eq!(result.sources_found, 0);
    assert!(result.search_results.is_empty());
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_sqlite_store_degrades_to_ungrounded_answer() {
    let dir = tempfile::tempdir().unwrap();
    let generator = ScriptedGenerator::ok();
    let pipeline = pipeline(
        Arc::new(SqliteStore::new(dir.path().join("absent.db"))),
        Arc::new(HashEmbeddingProvider::default()),
        generator,
    );

    let result = pipeline.answer("question", None::<&str>).await;
    assert_eq!(result.sources_found, 0);
    assert_eq!(result.answer, "Generated answer.");
}

#[tokio::test]
async fn ingest_then_answer_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("teradata_to_pyspark.md"),
        "# Conversion\n## QUALIFY\nThe QUALIFY clause is converted to a window function with a filter.",
    )
    .unwrap();
    fs::write(docs.join("teradata_to_redshift.md"), "# Redshift\nTO_CHAR formats dates as strings.")
        .unwrap();
    fs::write(docs.join("empty.md"), "").unwrap();

    let config = RagConfig::builder()
        .store_path(dir.path().join("vector.db"))
        .docs_dir(&docs)
        .chunk_size(200)
        .chunk_overlap(20)
        .build()
        .unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
        .generator(ScriptedGenerator::ok())
        .build()
        .unwrap();

    // One chunk per non-empty document; the empty file is never stored.
    assert_eq!(pipeline.load_knowledge_base(true).await.unwrap(), 2);
    assert_eq!(pipeline.reload_knowledge_base().await.unwrap(), 0);
    assert_eq!(pipeline.load_knowledge_base(true).await.unwrap(), 2);

    let stats = pipeline.statistics().await.unwrap();
    assert_eq!(stats.documents_loaded, 2);
    assert_eq!(stats.total_chunks, 2);
    assert_eq!(stats.embedding_model, "hash-bow");
    assert_eq!(stats.embedding_dimension, HashEmbeddingProvider::DEFAULT_DIMENSIONS);

    let results = pipeline.search("QUALIFY clause window function", 5, None::<&str>).await;
    assert_eq!(results[0].file_name, "teradata_to_pyspark.md");

    let result = pipeline
        .answer("How is the QUALIFY clause converted?", "teradata_to_redshift.md")
        .await;
    assert!(result.search_results.iter().all(|r| r.file_name == "teradata_to_redshift.md"));
    assert!(result.sources_found <= 1);
}

#[tokio::test]
async fn ingestion_rejects_vectors_narrower_than_advertised() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("guide.md"), "# Guide\nSetup is easy.").unwrap();

    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = RagPipeline::builder()
        .config(RagConfig { docs_dir: dir.path().to_path_buf(), ..RagConfig::default() })
        .embedding_provider(Arc::new(NarrowEmbeddingProvider))
        .vector_store(store.clone())
        .generator(ScriptedGenerator::ok())
        .build()
        .unwrap();

    let err = pipeline.load_knowledge_base(true).await.unwrap_err();
    assert!(matches!(err, RagError::IngestionError(_)));
    assert!(err.to_string().contains("expected 1536"));
    assert_eq!(store.stats().await.unwrap().documents, 0);
}
