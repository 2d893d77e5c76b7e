//! # carbonmatch Core
//!
//! Core library for the carbonmatch product matcher.
//!
//! This crate provides the fundamental data structures:
//!
//! - [`Vector`] - Dense embedding vector with SIMD operations
//! - [`SimilarityIndex`] - Exact cosine nearest-neighbor index over unit vectors
//! - [`CatalogRecord`] - One indexed catalog row (name, cleaned text, embedding, rating)
//! - [`MatchResult`] - The answer to a single match call
//!
//! ## Example
//!
//! ```rust
//! use carbonmatch_core::{SimilarityIndex, Vector};
//!
//! let rows = vec![
//!     Vector::new(vec![1.0, 0.0, 0.0]),
//!     Vector::new(vec![0.0, 1.0, 0.0]),
//! ];
//! let index = SimilarityIndex::build(&rows).unwrap();
//!
//! let hits = index.search(&Vector::new(vec![0.9, 0.1, 0.0]), 5).unwrap();
//! assert_eq!(hits[0].0, 0);
//! assert_eq!(hits.len(), 2);
//! ```

pub mod catalog;
pub mod error;
pub mod index;
pub mod vector;

/// SIMD-optimized vector operations
///
/// Provides hardware-accelerated dot products:
/// - AVX2/FMA on x86_64
/// - NEON on ARM64/Apple Silicon
pub mod simd;

pub use catalog::{CatalogEntry, CatalogRecord, MatchResult};
pub use error::{Error, Result};
pub use index::{SimilarityIndex, UNIT_NORM_TOLERANCE};
pub use vector::Vector;
