//! # carbonmatch Similarity
//!
//! Hybrid product matching on top of the core similarity index.
//!
//! A raw product name goes through four stages:
//!
//! - **Normalize**: the same deterministic cleaning applied to catalog rows
//! - **Embed**: any [`EmbeddingProvider`] maps cleaned text to a vector
//! - **Retrieve**: exact cosine top-K from the [`SimilarityIndex`](carbonmatch_core::SimilarityIndex)
//! - **Rerank**: blend semantic and lexical scores, highest combined wins
//!
//! ## Example
//!
//! ```rust
//! use carbonmatch_core::CatalogEntry;
//! use carbonmatch_similarity::{HashingEmbedder, Matcher, MatcherConfig};
//!
//! let catalog = vec![
//!     CatalogEntry::new("tomato", "tomato", "A"),
//!     CatalogEntry::new("tomatoes fresh", "tomatoes fresh", "A"),
//!     CatalogEntry::new("basil", "basil", "B"),
//! ];
//! let matcher = Matcher::build(&catalog, HashingEmbedder::default(), MatcherConfig::default()).unwrap();
//!
//! let result = matcher.match_product("Fresh Tomatoes 500g").unwrap();
//! assert_eq!(result.carbon_rating, "A");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Normalizer  │────>│  Embedder   │────>│   Index     │
//! │ (raw→clean) │     │ (clean→v)   │     │  (top-K)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!       │                                        │
//!       │              ┌─────────────┐           │
//!       └─────────────>│  Reranker   │<──────────┘
//!                      │ (α·sem+…)   │
//!                      └─────────────┘
//!                             │
//!                      ┌─────────────┐
//!                      │ MatchResult │
//!                      └─────────────┘
//! ```

pub mod distance;
pub mod embedder;
pub mod matcher;
pub mod normalize;
pub mod rerank;

pub use distance::{lexical_similarity, token_sort_ratio, trigram_similarity, LexicalMetric};
pub use embedder::{encode_checked, EmbeddingProvider, HashingEmbedder, DEFAULT_EMBEDDING_DIM};
pub use matcher::{
    BatchItem, BatchOptions, BatchReport, Explanation, Matcher, MatcherConfig, Query,
};
pub use normalize::{normalize, Normalizer, NormalizerConfig};
pub use rerank::{rerank, select_best, Candidate, Candidates, Reranker};
