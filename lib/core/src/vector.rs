use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// A dense embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        crate::simd::norm_simd(&self.data)
    }

    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        crate::simd::dot_product_simd(&self.data, &other.data)
    }

    /// Compute cosine similarity with another vector
    /// Returns 0.0 for mismatched dimensions or a zero-norm side
    #[inline]
    pub fn cosine_similarity(&self, other: &Vector) -> f32 {
        if self.dim() != other.dim() {
            return 0.0;
        }

        let norm_a = self.norm();
        let norm_b = other.norm();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        self.dot(other) / (norm_a * norm_b)
    }

    /// Unit-length copy of this vector.
    ///
    /// Fails with [`Error::DegenerateVector`] when the vector has a
    /// non-finite component or a norm too small to divide by.
    pub fn try_normalized(&self) -> Result<Self> {
        if let Some(pos) = self.data.iter().position(|x| !x.is_finite()) {
            return Err(Error::DegenerateVector(format!(
                "non-finite component at position {}",
                pos
            )));
        }

        let norm = self.norm();
        if !norm.is_finite() || norm <= f32::EPSILON {
            return Err(Error::DegenerateVector(format!(
                "norm {} cannot be normalized",
                norm
            )));
        }

        let inv_norm = 1.0 / norm;
        Ok(Self::new(self.data.iter().map(|x| x * inv_norm).collect()))
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}
