//! In-memory vector store.
//!
//! [`InMemoryVectorStore`] keeps documents and chunks in a `Vec` protected by a
//! `tokio::sync::RwLock`. It suits tests and embedding the engine without a
//! database file.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Document, NewChunk, StoredChunk};
use crate::error::Result;
use crate::vectorstore::{StoreStats, VectorStore};

#[derive(Debug, Default)]
struct Inner {
    documents: Vec<(Document, Vec<StoredChunk>)>,
    next_document_id: i64,
    next_chunk_id: i64,
}

/// An in-memory [`VectorStore`].
///
/// Ids are assigned monotonically, so [`scan`](VectorStore::scan) order is
/// insertion order across replacements.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn scan(&self) -> Result<Vec<StoredChunk>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<StoredChunk> =
            inner.documents.iter().flat_map(|(_, chunks)| chunks.iter().cloned()).collect();
        rows.sort_by_key(|c| c.id);
        Ok(rows)
    }

    async fn contains_document(&self, file_name: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.documents.iter().any(|(doc, _)| doc.file_name == file_name))
    }

    async fn replace_document(&self, file_name: &str, chunks: &[NewChunk]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.documents.retain(|(doc, _)| doc.file_name != file_name);

        inner.next_document_id += 1;
        let document_id = inner.next_document_id;
        let mut stored = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            inner.next_chunk_id += 1;
            stored.push(StoredChunk {
                id: inner.next_chunk_id,
                document_id,
                file_name: file_name.to_string(),
                text: chunk.text.clone(),
                embedding: chunk.embedding.clone(),
                embedding_dim: chunk.embedding.len(),
            });
        }

        let document =
            Document { id: document_id, file_name: file_name.to_string(), chunk_count: stored.len() };
        inner.documents.push((document, stored));
        Ok(())
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut documents: Vec<Document> =
            inner.documents.iter().map(|(doc, _)| doc.clone()).collect();
        documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(documents)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.read().await;
        Ok(StoreStats {
            documents: inner.documents.len(),
            chunks: inner.documents.iter().map(|(_, chunks)| chunks.len()).sum(),
            declared_chunks: inner.documents.iter().map(|(doc, _)| doc.chunk_count).sum(),
        })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> NewChunk {
        NewChunk { text: text.to_string(), embedding: vec![1.0, 0.0] }
    }

    #[tokio::test]
    async fn replace_overwrites_previous_chunks() {
        let store = InMemoryVectorStore::new();
        store.replace_document("a.md", &[chunk("one"), chunk("two")]).await.unwrap();
        store.replace_document("b.md", &[chunk("three")]).await.unwrap();
        store.replace_document("a.md", &[chunk("four")]).await.unwrap();

        let rows = store.scan().await.unwrap();
        let texts: Vec<&str> = rows.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["three", "four"]);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { documents: 2, chunks: 2, declared_chunks: 2 });
        assert!(store.contains_document("a.md").await.unwrap());
        assert!(!store.contains_document("c.md").await.unwrap());
    }
}
