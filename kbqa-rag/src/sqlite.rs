//! SQLite vector store backend.
//!
//! Provides [`SqliteStore`], which implements [`VectorStore`] on a single
//! SQLite file using [sqlx](https://docs.rs/sqlx). Every operation opens its
//! own connection and closes it before returning; no connection outlives a
//! call.
//!
//! # Schema
//!
//! ```text
//! documents(id, file_name UNIQUE, chunk_count, ingested_at)
//! chunks(id, doc_id -> documents.id, chunk_index, chunk_content, embedding BLOB, embedding_dim)
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use tracing::{debug, warn};

use crate::codec::{decode_embedding, encode_embedding};
use crate::document::{Document, NewChunk, StoredChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::{StoreStats, VectorStore};

const BACKEND: &str = "sqlite";

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL UNIQUE,
        chunk_count INTEGER NOT NULL DEFAULT 0,
        ingested_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        chunk_index INTEGER NOT NULL,
        chunk_content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        embedding_dim INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id)",
];

const SCAN_QUERY: &str = "SELECT c.id, c.doc_id, c.chunk_content, d.file_name, c.embedding, c.embedding_dim
     FROM chunks c
     JOIN documents d ON c.doc_id = d.id
     ORDER BY c.id";

/// A [`VectorStore`] backed by one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Create a store handle for the database at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_err(e: sqlx::Error) -> RagError {
        RagError::store(BACKEND, e.to_string())
    }

    /// Open a connection. Read paths pass `create = false` so querying never
    /// materialises an empty database.
    async fn connect(&self, create: bool) -> Result<SqliteConnection> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(create)
            .foreign_keys(true);
        SqliteConnection::connect_with(&options).await.map_err(|e| {
            RagError::store(BACKEND, format!("failed to open '{}': {e}", self.path.display()))
        })
    }

    async fn close(conn: SqliteConnection) {
        if let Err(e) = conn.close().await {
            warn!(error = %e, "failed to close sqlite connection");
        }
    }

    fn decode_row(row: &SqliteRow) -> Result<StoredChunk> {
        let id: i64 = row.try_get("id").map_err(Self::map_err)?;
        let document_id: i64 = row.try_get("doc_id").map_err(Self::map_err)?;
        let text: String = row.try_get("chunk_content").map_err(Self::map_err)?;
        let file_name: String = row.try_get("file_name").map_err(Self::map_err)?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(Self::map_err)?;
        let dim: i64 = row.try_get("embedding_dim").map_err(Self::map_err)?;
        let embedding_dim = usize::try_from(dim)
            .map_err(|_| RagError::store(BACKEND, format!("negative embedding_dim {dim}")))?;
        let embedding = decode_embedding(&blob, embedding_dim)?;
        Ok(StoredChunk { id, document_id, file_name, text, embedding, embedding_dim })
    }

    async fn scan_with(conn: &mut SqliteConnection) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(SCAN_QUERY).fetch_all(&mut *conn).await.map_err(Self::map_err)?;
        let total = rows.len();
        let chunks: Vec<StoredChunk> = rows
            .iter()
            .filter_map(|row| match Self::decode_row(row) {
                Ok(chunk) => Some(chunk),
                Err(e) => {
                    warn!(error = %e, "skipping malformed chunk row");
                    None
                }
            })
            .collect();
        debug!(rows = total, decoded = chunks.len(), "scanned chunk table");
        Ok(chunks)
    }

    async fn contains_with(conn: &mut SqliteConnection, file_name: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) FROM documents WHERE file_name = ?")
            .bind(file_name)
            .fetch_one(&mut *conn)
            .await
            .map_err(Self::map_err)?;
        let count: i64 = row.try_get(0).map_err(Self::map_err)?;
        Ok(count > 0)
    }

    async fn replace_with(
        conn: &mut SqliteConnection,
        file_name: &str,
        chunks: &[NewChunk],
    ) -> Result<()> {
        let mut tx = conn.begin().await.map_err(Self::map_err)?;

        sqlx::query("DELETE FROM chunks WHERE doc_id IN (SELECT id FROM documents WHERE file_name = ?)")
            .bind(file_name)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        sqlx::query("DELETE FROM documents WHERE file_name = ?")
            .bind(file_name)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;

        let chunk_count = i64::try_from(chunks.len())
            .map_err(|_| RagError::store(BACKEND, "chunk count overflows i64"))?;
        let doc_id = sqlx::query(
            "INSERT INTO documents (file_name, chunk_count, ingested_at) VALUES (?, ?, ?)",
        )
        .bind(file_name)
        .bind(chunk_count)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(Self::map_err)?
        .last_insert_rowid();

        for (index, chunk) in chunks.iter().enumerate() {
            let dim = i64::try_from(chunk.embedding.len())
                .map_err(|_| RagError::store(BACKEND, "embedding dimension overflows i64"))?;
            sqlx::query(
                "INSERT INTO chunks (doc_id, chunk_index, chunk_content, embedding, embedding_dim)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(doc_id)
            .bind(index as i64)
            .bind(&chunk.text)
            .bind(encode_embedding(&chunk.embedding))
            .bind(dim)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        }

        tx.commit().await.map_err(Self::map_err)
    }

    async fn documents_with(conn: &mut SqliteConnection) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT id, file_name, chunk_count FROM documents ORDER BY file_name")
            .fetch_all(&mut *conn)
            .await
            .map_err(Self::map_err)?;
        rows.iter()
            .map(|row| {
                let chunk_count: i64 = row.try_get("chunk_count").map_err(Self::map_err)?;
                Ok(Document {
                    id: row.try_get("id").map_err(Self::map_err)?,
                    file_name: row.try_get("file_name").map_err(Self::map_err)?,
                    chunk_count: usize::try_from(chunk_count).unwrap_or(0),
                })
            })
            .collect()
    }

    async fn count_with(conn: &mut SqliteConnection, sql: &str) -> Result<usize> {
        let row = sqlx::query(sql).fetch_one(&mut *conn).await.map_err(Self::map_err)?;
        let count: i64 = row.try_get(0).map_err(Self::map_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn stats_with(conn: &mut SqliteConnection) -> Result<StoreStats> {
        Ok(StoreStats {
            documents: Self::count_with(conn, "SELECT COUNT(*) FROM documents").await?,
            chunks: Self::count_with(conn, "SELECT COUNT(*) FROM chunks").await?,
            declared_chunks: Self::count_with(
                conn,
                "SELECT COALESCE(SUM(chunk_count), 0) FROM documents",
            )
            .await?,
        })
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::store(BACKEND, format!("failed to create '{}': {e}", parent.display()))
            })?;
        }

        let mut conn = self.connect(true).await?;
        let mut result = Ok(());
        for statement in SCHEMA {
            if let Err(e) = sqlx::query(statement).execute(&mut conn).await {
                result = Err(Self::map_err(e));
                break;
            }
        }
        Self::close(conn).await;
        result
    }

    async fn scan(&self) -> Result<Vec<StoredChunk>> {
        let mut conn = self.connect(false).await?;
        let result = Self::scan_with(&mut conn).await;
        Self::close(conn).await;
        result
    }

    async fn contains_document(&self, file_name: &str) -> Result<bool> {
        let mut conn = self.connect(false).await?;
        let result = Self::contains_with(&mut conn, file_name).await;
        Self::close(conn).await;
        result
    }

    async fn replace_document(&self, file_name: &str, chunks: &[NewChunk]) -> Result<()> {
        let mut conn = self.connect(false).await?;
        let result = Self::replace_with(&mut conn, file_name, chunks).await;
        Self::close(conn).await;
        result
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        let mut conn = self.connect(false).await?;
        let result = Self::documents_with(&mut conn).await;
        Self::close(conn).await;
        result
    }

    async fn stats(&self) -> Result<StoreStats> {
        let mut conn = self.connect(false).await?;
        let result = Self::stats_with(&mut conn).await;
        Self::close(conn).await;
        result
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk { text: text.to_string(), embedding }
    }

    #[tokio::test]
    async fn round_trips_documents_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("nested/vector.db"));
        store.initialize().await.unwrap();

        store
            .replace_document(
                "guide.md",
                &[chunk("Setup is easy", vec![1.0, 0.0, 0.0]), chunk("Setup is hard", vec![0.0, 1.0, 0.0])],
            )
            .await
            .unwrap();
        store.replace_document("other.md", &[chunk("Unrelated", vec![0.0, 0.0, 1.0])]).await.unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].text, "Setup is easy");
        assert_eq!(rows[0].file_name, "guide.md");
        assert_eq!(rows[0].embedding, vec![1.0, 0.0, 0.0]);
        assert_eq!(rows[0].embedding_dim, 3);
        assert_eq!(rows[2].file_name, "other.md");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { documents: 2, chunks: 3, declared_chunks: 3 });

        let docs = store.documents().await.unwrap();
        assert_eq!(docs.iter().map(|d| d.file_name.as_str()).collect::<Vec<_>>(), vec!["guide.md", "other.md"]);
        assert_eq!(docs[0].chunk_count, 2);
    }

    #[tokio::test]
    async fn replacing_a_document_drops_its_old_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("vector.db"));
        store.initialize().await.unwrap();

        store.replace_document("a.md", &[chunk("old", vec![1.0]), chunk("old2", vec![1.0])]).await.unwrap();
        store.replace_document("a.md", &[chunk("new", vec![1.0])]).await.unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "new");
        assert!(store.contains_document("a.md").await.unwrap());
        assert!(!store.contains_document("b.md").await.unwrap());
    }

    #[tokio::test]
    async fn reading_a_missing_database_fails_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let store = SqliteStore::new(&path);

        assert!(store.scan().await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn malformed_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("vector.db"));
        store.initialize().await.unwrap();
        store.replace_document("a.md", &[chunk("good", vec![0.5, 0.5])]).await.unwrap();

        let mut conn = store.connect(false).await.unwrap();
        sqlx::query(
            "INSERT INTO chunks (doc_id, chunk_index, chunk_content, embedding, embedding_dim)
             SELECT id, 1, 'truncated', X'0000', 2 FROM documents",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();

        let rows = store.scan().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "good");
    }
}
