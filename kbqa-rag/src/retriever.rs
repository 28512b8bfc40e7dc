//! Brute-force semantic retrieval with per-source deduplication.
//!
//! Every query embeds the question, scans the whole store, scores each chunk
//! by cosine similarity, keeps the single best chunk per source file, ranks
//! by score and applies the optional [`FileFilter`] before truncating to
//! `top_k`. No index is assumed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::document::{FileFilter, SearchResult, StoredChunk};
use crate::embedding::{EmbeddingProvider, embed_checked};
use crate::error::Result;
use crate::similarity::cosine_similarity;
use crate::vectorstore::VectorStore;

/// Scans a [`VectorStore`] and ranks its sources against a query.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Create a retriever over `store` using `embedding_provider` for queries.
    pub fn new(store: Arc<dyn VectorStore>, embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedding_provider }
    }

    /// Search for the `top_k` best-matching sources.
    ///
    /// Never fails: an embedding or store failure is logged and yields an
    /// empty result set. Use [`try_search`](Self::try_search) to observe
    /// embedding failures.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &FileFilter,
    ) -> Vec<SearchResult> {
        match self.try_search(query, top_k, filter).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// Search, propagating embedding failures.
    ///
    /// Store failures still produce `Ok` with an empty result set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`](crate::RagError::EmbeddingError) if
    /// the query cannot be embedded.
    pub async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        filter: &FileFilter,
    ) -> Result<Vec<SearchResult>> {
        let (query_embedding, dim) = embed_checked(self.embedding_provider.as_ref(), query).await?;
        debug!(query_len = query.len(), dim, "embedded query");

        let chunks = match self.store.scan().await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!(store = %self.store.location(), error = %e, "store scan failed");
                return Ok(Vec::new());
            }
        };

        let scanned = chunks.len();
        let results = rank(&query_embedding, chunks, top_k, filter);
        info!(scanned, result_count = results.len(), "search completed");
        Ok(results)
    }
}

/// Score, deduplicate, rank, filter and truncate in one pass.
pub fn rank(
    query_embedding: &[f32],
    chunks: Vec<StoredChunk>,
    top_k: usize,
    filter: &FileFilter,
) -> Vec<SearchResult> {
    best_per_source(score_chunks(query_embedding, chunks))
        .into_iter()
        .filter(|r| filter.matches(&r.file_name))
        .take(top_k)
        .collect()
}

/// Chunks left out by [`score_chunks`], by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Exclusions {
    mismatched: usize,
    non_finite: usize,
}

/// Score every chunk against the query, in scan order.
///
/// Chunks whose dimensionality differs from the query's are excluded, as are
/// chunks producing a non-finite score.
pub fn score_chunks(query_embedding: &[f32], chunks: Vec<StoredChunk>) -> Vec<SearchResult> {
    let (scored, excluded) = score_and_count(query_embedding, chunks);
    if excluded.mismatched > 0 {
        warn!(
            mismatched = excluded.mismatched,
            query_dim = query_embedding.len(),
            "chunks excluded from scoring due to dimension mismatch"
        );
    }
    if excluded.non_finite > 0 {
        warn!(non_finite = excluded.non_finite, "chunks excluded from scoring due to non-finite scores");
    }
    scored
}

fn score_and_count(
    query_embedding: &[f32],
    chunks: Vec<StoredChunk>,
) -> (Vec<SearchResult>, Exclusions) {
    let mut excluded = Exclusions::default();
    let mut scored = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        if chunk.embedding_dim != chunk.embedding.len() {
            debug!(chunk_id = chunk.id, "chunk embedding length disagrees with its recorded dimension");
            excluded.mismatched += 1;
            continue;
        }
        match cosine_similarity(query_embedding, &chunk.embedding) {
            Ok(score) if score.is_finite() => {
                scored.push(SearchResult { text: chunk.text, file_name: chunk.file_name, score });
            }
            Ok(_) => {
                debug!(chunk_id = chunk.id, "chunk produced a non-finite score");
                excluded.non_finite += 1;
            }
            Err(e) => {
                debug!(chunk_id = chunk.id, error = %e, "chunk excluded from scoring");
                excluded.mismatched += 1;
            }
        }
    }
    (scored, excluded)
}

/// Keep the highest-scoring result per source file, sorted by score descending.
///
/// Ties within a source keep the earliest result. Ties between sources keep
/// the order in which each source was first seen.
pub fn best_per_source(scored: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut best: Vec<SearchResult> = Vec::new();

    for result in scored {
        match positions.get(&result.file_name) {
            Some(&index) => {
                if result.score > best[index].score {
                    best[index] = result;
                }
            }
            None => {
                positions.insert(result.file_name.clone(), best.len());
                best.push(result);
            }
        }
    }

    best.sort_by(|a, b| b.score.total_cmp(&a.score));
    best
}
