//! Binary encoding of embeddings for storage.
//!
//! Embeddings are stored as packed little-endian `f32` values with the
//! dimensionality kept in a separate column, so a row can be decoded without
//! knowing which embedding model is currently configured.

use crate::error::{RagError, Result};

const BACKEND: &str = "codec";

/// Encode an embedding as little-endian `f32` bytes.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode an embedding of `dim` components.
///
/// # Errors
///
/// Returns [`RagError::VectorStoreError`] if `dim` is zero or the byte length
/// does not equal `dim * 4`.
pub fn decode_embedding(bytes: &[u8], dim: usize) -> Result<Vec<f32>> {
    if dim == 0 {
        return Err(RagError::store(BACKEND, "embedding dimension must be positive"));
    }
    let expected = dim
        .checked_mul(4)
        .ok_or_else(|| RagError::store(BACKEND, format!("embedding dimension {dim} overflows")))?;
    if bytes.len() != expected {
        return Err(RagError::store(
            BACKEND,
            format!("embedding blob is {} bytes, expected {expected} for dimension {dim}", bytes.len()),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_little_endian_f32() {
        let bytes = encode_embedding(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_embedding(&bytes, 2).unwrap(), vec![1.0, -2.5]);
    }

    #[test]
    fn rejects_length_that_disagrees_with_dimension() {
        let bytes = encode_embedding(&[1.0, 2.0, 3.0]);
        assert!(decode_embedding(&bytes, 4).is_err());
        assert!(decode_embedding(&bytes[..11], 3).is_err());
    }

    #[test]
    fn rejects_zero_dimension() {
        assert!(decode_embedding(&[], 0).is_err());
    }
}
