//! Turning text into vectors.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Maps text to a fixed-width vector.
///
/// Questions and stored chunks must be embedded by the same provider for
/// their cosine similarity to mean anything; [`model_name`](Self::model_name)
/// and [`dimensions`](Self::dimensions) identify it in statistics.
///
/// ```rust,ignore
/// use kbqa_rag::{EmbeddingProvider, HashEmbeddingProvider};
///
/// let provider = HashEmbeddingProvider::new(256);
/// let vector = provider.embed("hello world").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order. Defaults to awaiting
    /// [`embed`](Self::embed) once per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Width of every vector this provider returns.
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Embed `text` and verify the vector has the provider's advertised dimensionality.
///
/// Returns the vector together with its dimension.
///
/// # Errors
///
/// Propagates provider failures, and returns [`RagError::EmbeddingError`] for
/// an empty or wrong-length vector.
pub async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<(Vec<f32>, usize)> {
    let vector = provider.embed(text).await?;
    let expected = provider.dimensions();
    if vector.is_empty() || vector.len() != expected {
        return Err(RagError::EmbeddingError {
            provider: provider.model_name().to_string(),
            message: format!(
                "provider returned a {}-dimensional vector, expected {expected}",
                vector.len()
            ),
        });
    }
    let dim = vector.len();
    Ok((vector, dim))
}

/// A deterministic, offline embedding provider based on hashed word features.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimensions` buckets with a hash-derived sign, and the resulting vector is
/// L2-normalised. Texts that share vocabulary therefore score higher than
/// unrelated texts. Empty input yields the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Default embedding width.
    pub const DEFAULT_DIMENSIONS: usize = 256;

    /// Create a provider producing vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn fnv1a(token: &str) -> u64 {
        token.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let hash = Self::fnv1a(&token);
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }
}
