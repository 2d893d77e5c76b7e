//! # carbonmatch
//!
//! Maps free-text product names to the closest entry of a reference
//! catalog and returns that entry's carbon rating.
//!
//! Matching is hybrid: an exact cosine search over embeddings retrieves
//! the top-K catalog rows, then a reranker blends each row's semantic
//! score with a lexical similarity between cleaned names.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! carbonmatch build --catalog data/catalog.csv --index-dir data/index
//! carbonmatch match --input data/input.csv --index-dir data/index --output data/output.csv
//! carbonmatch evaluate --ground-truth data/ground-truth.csv --output data/output.csv
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use carbonmatch::prelude::*;
//!
//! let catalog = vec![
//!     CatalogEntry::new("Oat Milk", "oat milk", "A"),
//!     CatalogEntry::new("Whole Milk", "whole milk", "C"),
//! ];
//! let matcher = Matcher::build(&catalog, HashingEmbedder::default(), MatcherConfig::default()).unwrap();
//!
//! let result = matcher.match_product("Organic Oat Milk 1L").unwrap();
//! assert_eq!(result.matched_product, "Oat Milk");
//! ```
//!
//! ## Crate Structure
//!
//! - `carbonmatch-core` - Vector, SIMD kernels, exact similarity index, catalog types, errors
//! - `carbonmatch-similarity` - Normalizer, embedding providers, reranker, matcher
//! - `carbonmatch-storage` - Persisted index artifacts and CSV tables

pub mod evaluate;
pub mod pipeline;

// Re-export core types
pub use carbonmatch_core::{
    CatalogEntry, CatalogRecord, Error, MatchResult, Result, SimilarityIndex, Vector,
};

// Re-export the matching engine
pub use carbonmatch_similarity::{
    normalize, BatchOptions, BatchReport, EmbeddingProvider, HashingEmbedder, LexicalMetric,
    Matcher, MatcherConfig, Normalizer, NormalizerConfig, Reranker,
};

// Re-export storage
pub use carbonmatch_storage::{ArtifactStore, CatalogColumns, Manifest};

pub use evaluate::{evaluate, Evaluation};
pub use pipeline::{build_index, build_index_from_csv, build_index_with_normalizer, open_matcher};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ArtifactStore, BatchOptions, CatalogColumns, CatalogEntry, EmbeddingProvider, Error,
        HashingEmbedder, LexicalMetric, MatchResult, Matcher, MatcherConfig, Result, Vector,
    };
}

/// SIMD-optimized vector operations
pub mod simd {
    pub use carbonmatch_core::simd::{dot_product_simd, norm_simd};
}
