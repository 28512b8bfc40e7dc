//! Vector store trait: durable documents and chunks with embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Document, NewChunk, StoredChunk};
use crate::error::Result;

/// Row counts reported by a [`VectorStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of documents.
    pub documents: usize,
    /// Number of chunk rows.
    pub chunks: usize,
    /// Sum of the per-document `chunk_count` values.
    pub declared_chunks: usize,
}

/// A storage backend holding documents and their embedded chunks.
///
/// Query-time access is a full [`scan`](VectorStore::scan); the retriever does
/// all scoring itself. Writes are whole-document replacements issued by the
/// ingestion loader and must not run concurrently with queries.
///
/// # Example
///
/// ```rust,ignore
/// use kbqa_rag::{InMemoryVectorStore, NewChunk, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.replace_document("guide.md", &chunks).await?;
/// let rows = store.scan().await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Prepare the backend for writes (create files, schema). Idempotent.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Return every decodable chunk with its document's file name, in chunk-id order.
    ///
    /// Individual malformed rows are skipped; an `Err` means the whole scan failed.
    async fn scan(&self) -> Result<Vec<StoredChunk>>;

    /// Whether a document with this file name exists.
    async fn contains_document(&self, file_name: &str) -> Result<bool>;

    /// Atomically replace the document named `file_name` and all of its chunks.
    async fn replace_document(&self, file_name: &str, chunks: &[NewChunk]) -> Result<()>;

    /// List stored documents ordered by file name.
    async fn documents(&self) -> Result<Vec<Document>>;

    /// Return document and chunk counts.
    async fn stats(&self) -> Result<StoreStats>;

    /// A human-readable label for the store's location.
    fn location(&self) -> String;
}
