//! Hybrid reranker
//!
//! Rescores the top-K candidates from the similarity index by blending
//! their semantic score with a lexical similarity between cleaned texts:
//!
//! ```text
//! combined = alpha * semantic + (1 - alpha) * lexical
//! ```
//!
//! Only the K retrieved rows are scored lexically. A row with a better
//! lexical match that falls outside the top K is never considered; that
//! recall loss is the price of not fuzzy-matching the whole catalog.

use crate::distance::{lexical_similarity, LexicalMetric};
use carbonmatch_core::{CatalogRecord, Error, Result};
use serde::Serialize;
use smallvec::SmallVec;

/// Candidate lists rarely exceed the default top-K of 10.
pub type Candidates = SmallVec<[Candidate; 16]>;

/// One reranked candidate with its score breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub record_index: usize,
    pub semantic_score: f32,
    pub lexical_score: f32,
    pub combined_score: f32,
}

/// Reranker blending semantic and lexical similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reranker {
    alpha: f32,
    metric: LexicalMetric,
}

impl Reranker {
    /// `alpha` is the semantic weight and must lie in [0, 1]
    pub fn new(alpha: f32, metric: LexicalMetric) -> Result<Self> {
        validate_alpha(alpha)?;
        Ok(Self { alpha, metric })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn metric(&self) -> LexicalMetric {
        self.metric
    }

    /// Copy of this reranker with a different semantic weight
    pub fn with_alpha(&self, alpha: f32) -> Result<Self> {
        Self::new(alpha, self.metric)
    }

    /// Score every candidate, keeping the input order
    pub fn score(
        &self,
        cleaned_query: &str,
        candidates: &[(usize, f32)],
        catalog: &[CatalogRecord],
    ) -> Result<Candidates> {
        candidates
            .iter()
            .map(|&(record_index, semantic_score)| {
                let record = catalog.get(record_index).ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "candidate row {} is outside a catalog of {} rows",
                        record_index,
                        catalog.len()
                    ))
                })?;

                let lexical_score = lexical_similarity(cleaned_query, &record.cleaned, self.metric);
                let combined_score =
                    self.alpha * semantic_score + (1.0 - self.alpha) * lexical_score;

                Ok(Candidate {
                    record_index,
                    semantic_score,
                    lexical_score,
                    combined_score,
                })
            })
            .collect()
    }

    /// Catalog row of the best candidate.
    ///
    /// Highest combined score wins; on a tie the candidate that came
    /// first in `candidates` is kept.
    pub fn rerank(
        &self,
        cleaned_query: &str,
        candidates: &[(usize, f32)],
        catalog: &[CatalogRecord],
    ) -> Result<usize> {
        let scored = self.score(cleaned_query, candidates, catalog)?;
        select_best(&scored)
            .map(|c| c.record_index)
            .ok_or_else(|| Error::InvalidConfig("no candidates to rerank".to_string()))
    }
}

/// Rerank with the default lexical metric
pub fn rerank(
    cleaned_query: &str,
    candidates: &[(usize, f32)],
    catalog: &[CatalogRecord],
    alpha: f32,
) -> Result<usize> {
    Reranker::new(alpha, LexicalMetric::default())?.rerank(cleaned_query, candidates, catalog)
}

/// First candidate with the strictly greatest combined score
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let (first, rest) = candidates.split_first()?;
    Some(rest.iter().fold(first, |best, c| {
        if c.combined_score > best.combined_score {
            c
        } else {
            best
        }
    }))
}

pub(crate) fn validate_alpha(alpha: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(Error::InvalidConfig(format!(
            "alpha must be within [0, 1], got {}",
            alpha
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonmatch_core::Vector;

    fn record(cleaned: &str, rating: &str) -> CatalogRecord {
        CatalogRecord::new(
            cleaned.to_string(),
            cleaned.to_string(),
            Vector::new(vec![1.0]),
            rating.to_string(),
        )
    }

    fn catalog() -> Vec<CatalogRecord> {
        vec![
            record("tomato", "A"),
            record("tomatoes", "A"),
            record("basil", "B"),
        ]
    }

    #[test]
    fn test_alpha_one_keeps_top_semantic_candidate() {
        // Lexically "tomatoes" is perfect, but alpha = 1 ignores it.
        let candidates = [(2, 0.9), (1, 0.8), (0, 0.7)];
        let best = rerank("tomatoes", &candidates, &catalog(), 1.0).unwrap();
        assert_eq!(best, 2);
    }

    #[test]
    fn test_alpha_zero_is_pure_lexical() {
        let candidates = [(2, 0.9), (0, 0.8), (1, 0.7)];
        let best = rerank("tomatoes", &candidates, &catalog(), 0.0).unwrap();
        assert_eq!(best, 1);
    }

    #[test]
    fn test_blend_can_overturn_semantic_order() {
        let candidates = [(2, 0.62), (1, 0.60)];
        let best = rerank("tomatoes", &candidates, &catalog(), 0.6).unwrap();
        assert_eq!(best, 1);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let catalog = vec![record("oat milk", "B"), record("milk oat", "C")];
        // Same semantic score and token_sort makes both lexically identical.
        let best = rerank("oat milk", &[(1, 0.5), (0, 0.5)], &catalog, 0.5).unwrap();
        assert_eq!(best, 1);
        let best = rerank("oat milk", &[(0, 0.5), (1, 0.5)], &catalog, 0.5).unwrap();
        assert_eq!(best, 0);
    }

    #[test]
    fn test_score_breakdown() {
        let reranker = Reranker::new(0.5, LexicalMetric::TokenSort).unwrap();
        let scored = reranker.score("tomatoes", &[(1, 0.4), (2, 0.2)], &catalog()).unwrap();

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].record_index, 1);
        assert_eq!(scored[0].lexical_score, 1.0);
        assert!((scored[0].combined_score - 0.7).abs() < 1e-6);
        for c in &scored {
            assert!((0.0..=1.0).contains(&c.lexical_score));
        }
    }

    #[test]
    fn test_alpha_out_of_range() {
        for alpha in [-0.1, 1.5, f32::NAN] {
            let err = rerank("x", &[(0, 1.0)], &catalog(), alpha).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_empty_candidates_fail() {
        let err = rerank("x", &[], &catalog(), 0.5).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_range_row_fails() {
        let err = rerank("x", &[(7, 1.0)], &catalog(), 0.5).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_with_alpha() {
        let reranker = Reranker::new(0.6, LexicalMetric::Trigram).unwrap();
        let semantic_only = reranker.with_alpha(1.0).unwrap();
        assert_eq!(semantic_only.alpha(), 1.0);
        assert_eq!(semantic_only.metric(), LexicalMetric::Trigram);
        assert!(reranker.with_alpha(2.0).is_err());
    }

    #[test]
    fn test_select_best_empty() {
        assert!(select_best(&[]).is_none());
    }
}
