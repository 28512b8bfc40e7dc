//! Loads a folder of markdown documents into a [`VectorStore`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::chunking::Chunker;
use crate::document::NewChunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Discover markdown files under `root`, sorted by path.
///
/// A missing `root` yields no files.
pub fn discover_markdown_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.exists() {
        return Ok(Vec::new());
    }
    if !root.is_dir() {
        return Err(RagError::IngestionError(format!(
            "docs path '{}' is not a directory",
            root.display()
        )));
    }

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

/// The file name recorded for `path`: its path relative to `root`, `/`-separated.
fn document_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Chunks and embeds documents from a folder, writing them to a store.
pub struct Ingestor {
    docs_dir: PathBuf,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    /// Create an ingestor for the markdown files under `docs_dir`.
    pub fn new(
        docs_dir: impl Into<PathBuf>,
        chunker: Arc<dyn Chunker>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { docs_dir: docs_dir.into(), chunker, embedding_provider, store }
    }

    /// Load every markdown file into the store and return the number of chunks written.
    ///
    /// With `overwrite == false`, files already present in the store are
    /// skipped. With `overwrite == true`, they are re-chunked and replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] naming the file whose read,
    /// embedding or write failed. Files loaded before the failure stay loaded.
    pub async fn load(&self, overwrite: bool) -> Result<usize> {
        let files = discover_markdown_files(&self.docs_dir)?;
        if files.is_empty() {
            warn!(docs_dir = %self.docs_dir.display(), "no markdown documents found");
            return Ok(0);
        }

        self.store.initialize().await?;

        let mut loaded = 0usize;
        for path in &files {
            let name = document_name(&self.docs_dir, path);
            if !overwrite && self.store.contains_document(&name).await? {
                debug!(file = %name, "already loaded, skipping");
                continue;
            }
            loaded += self.load_file(path, &name).await?;
        }

        info!(files = files.len(), chunks = loaded, overwrite, "knowledge base loaded");
        Ok(loaded)
    }

    async fn load_file(&self, path: &Path, name: &str) -> Result<usize> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            error!(file = %name, error = %e, "failed to read document");
            RagError::IngestionError(format!("failed to read '{}': {e}", path.display()))
        })?;

        let pieces = self.chunker.chunk(&text);
        if pieces.is_empty() {
            debug!(file = %name, "document is empty, skipping");
            return Ok(0);
        }

        let texts: Vec<&str> = pieces.iter().map(String::as_str).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(file = %name, error = %e, "embedding failed during ingestion");
            RagError::IngestionError(format!("embedding failed for '{name}': {e}"))
        })?;
        if embeddings.len() != pieces.len() {
            return Err(RagError::IngestionError(format!(
                "embedding provider returned {} vectors for {} chunks of '{name}'",
                embeddings.len(),
                pieces.len()
            )));
        }
        let expected = self.embedding_provider.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.is_empty() || e.len() != expected) {
            error!(file = %name, actual = bad.len(), expected, "embedding width disagrees with provider");
            return Err(RagError::IngestionError(format!(
                "embedding provider returned a {}-dimensional vector for '{name}', expected {expected}",
                bad.len()
            )));
        }

        let chunks: Vec<NewChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| NewChunk { text, embedding })
            .collect();

        self.store.replace_document(name, &chunks).await.map_err(|e| {
            error!(file = %name, error = %e, "store write failed during ingestion");
            RagError::IngestionError(format!("failed to store '{name}': {e}"))
        })?;

        info!(file = %name, chunk_count = chunks.len(), "ingested document");
        Ok(chunks.len())
    }
}
