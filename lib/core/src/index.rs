//! Exact cosine similarity index
//!
//! Rows are stored L2-normalized in one row-major buffer, so scoring a
//! query is a single dot product per row. Search is a full linear scan;
//! a bounded heap keeps only the best `k` rows.

use crate::simd::{dot_product_simd, norm_simd};
use crate::{Error, Result, Vector};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Accepted deviation of a stored row's norm from 1.0
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

// Larger is better: higher score first, then lower row index.
type RankKey = (OrderedFloat<f32>, Reverse<usize>);

/// Read-only matrix of unit-norm catalog vectors
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityIndex {
    dim: usize,
    rows: usize,
    data: Vec<f32>,
}

impl SimilarityIndex {
    /// Normalize and store `vectors` in order.
    ///
    /// Fails on an empty input, a zero dimension, rows of differing
    /// dimension, or any row that cannot be normalized.
    pub fn build<'a, I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Vector>,
    {
        let mut dim = 0;
        let mut rows = 0;
        let mut data = Vec::new();

        for (row, vector) in vectors.into_iter().enumerate() {
            if row == 0 {
                dim = vector.dim();
                if dim == 0 {
                    return Err(Error::InvalidConfig(
                        "vectors must have at least one dimension".to_string(),
                    ));
                }
            } else if vector.dim() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: vector.dim(),
                });
            }

            let unit = vector.try_normalized().map_err(|e| at_row(row, e))?;
            data.extend_from_slice(unit.as_slice());
            rows += 1;
        }

        if rows == 0 {
            return Err(Error::InvalidConfig(
                "cannot build an index from an empty catalog".to_string(),
            ));
        }

        Ok(Self { dim, rows, data })
    }

    /// Rebuild an index from an already-normalized row-major matrix.
    ///
    /// The unit-norm invariant is checked again rather than trusted.
    pub fn from_normalized(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "vectors must have at least one dimension".to_string(),
            ));
        }
        if data.is_empty() {
            return Err(Error::InvalidConfig(
                "cannot build an index from an empty catalog".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: data.len() % dim,
            });
        }

        for (row, chunk) in data.chunks_exact(dim).enumerate() {
            let norm = norm_simd(chunk);
            if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(Error::DegenerateVector(format!(
                    "row {} has norm {}, expected 1.0",
                    row, norm
                )));
            }
        }

        let rows = data.len() / dim;
        Ok(Self { dim, rows, data })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Normalized vector stored at `row`
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    /// The whole normalized matrix, row-major
    #[inline]
    pub fn as_matrix(&self) -> &[f32] {
        &self.data
    }

    /// Top `min(k, len)` rows by cosine similarity to `query`.
    ///
    /// Results are sorted by descending score; equal scores keep the
    /// lower row index first.
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".to_string()));
        }
        if query.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query.dim(),
            });
        }

        let query = query.try_normalized()?;
        let k = k.min(self.rows);

        // Min-heap on RankKey: the root is the worst of the kept rows.
        let mut heap: BinaryHeap<Reverse<RankKey>> = BinaryHeap::with_capacity(k + 1);
        for (row, stored) in self.data.chunks_exact(self.dim).enumerate() {
            let score = dot_product_simd(query.as_slice(), stored).clamp(-1.0, 1.0);
            let entry = Reverse((OrderedFloat(score), Reverse(row)));

            if heap.len() < k {
                heap.push(entry);
            } else if heap.peek().map_or(false, |worst| entry < *worst) {
                heap.pop();
                heap.push(entry);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse((score, Reverse(row)))| (row, score.into_inner()))
            .collect())
    }
}

fn at_row(row: usize, err: Error) -> Error {
    match err {
        Error::DegenerateVector(msg) => Error::DegenerateVector(format!("row {}: {}", row, msg)),
        other => other,
    }
}
