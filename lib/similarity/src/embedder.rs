//! Embedding providers
//!
//! The matcher only depends on [`EmbeddingProvider`]: a batch of cleaned
//! strings in, one fixed-dimension vector per string out. Model-backed
//! providers live outside this crate; [`HashingEmbedder`] is a
//! deterministic feature-hashing provider that needs no model files.

use crate::distance::hash_text_to_vector;
use carbonmatch_core::{Error, Result, Vector};
use std::sync::Arc;

/// Default dimension for hashed text embeddings
pub const DEFAULT_EMBEDDING_DIM: usize = 256;

/// Maps normalized text to dense vectors.
///
/// Every call in a deployment must return vectors of [`dim`](Self::dim)
/// components, one per input, in input order.
pub trait EmbeddingProvider {
    /// Stable identifier, recorded next to persisted embeddings
    fn name(&self) -> &str;

    fn dim(&self) -> usize;

    fn encode(&self, batch: &[String]) -> Result<Vec<Vector>>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn encode(&self, batch: &[String]) -> Result<Vec<Vector>> {
        (**self).encode(batch)
    }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn encode(&self, batch: &[String]) -> Result<Vec<Vector>> {
        (**self).encode(batch)
    }
}

/// Encode `batch` and verify the provider kept its contract
pub fn encode_checked<E: EmbeddingProvider + ?Sized>(
    provider: &E,
    batch: &[String],
    expected_dim: usize,
) -> Result<Vec<Vector>> {
    let vectors = provider.encode(batch)?;
    if vectors.len() != batch.len() {
        return Err(Error::Embedding(format!(
            "provider '{}' returned {} vectors for {} inputs",
            provider.name(),
            vectors.len(),
            batch.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.dim() != expected_dim) {
        return Err(Error::DimensionMismatch {
            expected: expected_dim,
            actual: bad.dim(),
        });
    }
    Ok(vectors)
}

/// Feature-hashing embedder over character trigrams and words.
///
/// Captures spelling overlap rather than meaning, which is enough for
/// catalogs of short product names and keeps builds reproducible.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self { dim })
    }

    /// Embed a single string
    pub fn embed(&self, text: &str) -> Vector {
        Vector::new(hash_text_to_vector(text, self.dim))
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-trigram-v1"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, batch: &[String]) -> Result<Vec<Vector>> {
        Ok(batch.iter().map(|text| self.embed(text)).collect())
    }
}
