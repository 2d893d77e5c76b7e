//! Matcher: normalize → embed → retrieve top-K → rerank
//!
//! A [`Matcher`] owns the catalog, its similarity index and the embedding
//! provider. Everything is read-only after construction, so one matcher
//! can serve any number of concurrent match calls by shared reference.

use crate::distance::LexicalMetric;
use crate::embedder::{encode_checked, EmbeddingProvider};
use crate::normalize::Normalizer;
use crate::rerank::{select_best, validate_alpha, Candidates, Reranker};
use carbonmatch_core::{
    CatalogEntry, CatalogRecord, Error, MatchResult, Result, SimilarityIndex, Vector,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Matching parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Candidates retrieved before reranking; clamped to the catalog size
    pub top_k: usize,
    /// Semantic weight in the blended score, within [0, 1]
    pub alpha: f32,
    /// Strings per embedding call while building
    pub batch_size: usize,
    pub lexical: LexicalMetric,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            alpha: 0.6,
            batch_size: 64,
            lexical: LexicalMetric::TokenSort,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        validate_alpha(self.alpha)
    }
}

/// A query after cleaning and embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub raw: String,
    pub cleaned: String,
    pub embedding: Vector,
}

/// Full scoring trace of one match call
#[derive(Debug, Clone)]
pub struct Explanation {
    pub query: Query,
    /// Retrieved candidates in retrieval order, with blended scores
    pub candidates: Candidates,
    /// Catalog row that wins
    pub best: usize,
}

/// Hybrid semantic + lexical catalog matcher
pub struct Matcher<E> {
    normalizer: Normalizer,
    provider: E,
    catalog: Vec<CatalogRecord>,
    index: SimilarityIndex,
    reranker: Reranker,
    config: MatcherConfig,
}

impl<E: EmbeddingProvider> Matcher<E> {
    /// Clean, embed and index `entries` with the built-in normalizer
    pub fn build(entries: &[CatalogEntry], provider: E, config: MatcherConfig) -> Result<Self> {
        Self::build_with_normalizer(entries, provider, config, Normalizer::default())
    }

    /// Clean, embed and index `entries`.
    ///
    /// Nothing is returned unless every row was embedded and indexed.
    pub fn build_with_normalizer(
        entries: &[CatalogEntry],
        provider: E,
        config: MatcherConfig,
        normalizer: Normalizer,
    ) -> Result<Self> {
        config.validate()?;
        if entries.is_empty() {
            return Err(Error::InvalidConfig("catalog is empty".to_string()));
        }

        let started = Instant::now();
        let dim = provider.dim();
        if dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "provider '{}' reports zero dimensions",
                provider.name()
            )));
        }

        let cleaned: Vec<String> = entries
            .iter()
            .map(|entry| normalizer.normalize(&entry.raw_text))
            .collect();

        let mut embeddings = Vec::with_capacity(cleaned.len());
        for chunk in cleaned.chunks(config.batch_size) {
            embeddings.extend(encode_checked(&provider, chunk, dim)?);
        }

        let catalog: Vec<CatalogRecord> = entries
            .iter()
            .zip(cleaned)
            .zip(embeddings)
            .map(|((entry, cleaned), embedding)| {
                CatalogRecord::new(
                    entry.name.clone(),
                    cleaned,
                    embedding,
                    entry.carbon_rating.clone(),
                )
            })
            .collect();

        let index = SimilarityIndex::build(catalog.iter().map(|r| &r.embedding))?;
        let reranker = Reranker::new(config.alpha, config.lexical)?;

        info!(
            rows = catalog.len(),
            dim,
            provider = provider.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "catalog indexed"
        );

        Ok(Self {
            normalizer,
            provider,
            catalog,
            index,
            reranker,
            config,
        })
    }

    /// Assemble a matcher from previously built parts.
    ///
    /// Without an `index`, one is rebuilt from the catalog embeddings.
    /// Row counts and dimensions must line up across all parts.
    pub fn from_parts(
        catalog: Vec<CatalogRecord>,
        index: Option<SimilarityIndex>,
        provider: E,
        config: MatcherConfig,
    ) -> Result<Self> {
        config.validate()?;
        if catalog.is_empty() {
            return Err(Error::InvalidConfig("catalog is empty".to_string()));
        }

        let index = match index {
            Some(index) => index,
            None => SimilarityIndex::build(catalog.iter().map(|r| &r.embedding))?,
        };

        if index.len() != catalog.len() {
            return Err(Error::IndexUnavailable(format!(
                "index has {} rows but catalog has {}",
                index.len(),
                catalog.len()
            )));
        }
        if provider.dim() != index.dim() {
            return Err(Error::DimensionMismatch {
                expected: index.dim(),
                actual: provider.dim(),
            });
        }
        if let Some(record) = catalog.iter().find(|r| r.embedding.dim() != index.dim()) {
            return Err(Error::DimensionMismatch {
                expected: index.dim(),
                actual: record.embedding.dim(),
            });
        }

        let reranker = Reranker::new(config.alpha, config.lexical)?;
        Ok(Self {
            normalizer: Normalizer::default(),
            provider,
            catalog,
            index,
            reranker,
            config,
        })
    }

    /// Swap the normalizer used for queries
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn catalog(&self) -> &[CatalogRecord] {
        &self.catalog
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn provider(&self) -> &E {
        &self.provider
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Number of candidates actually retrieved per query
    pub fn effective_top_k(&self) -> usize {
        self.config.top_k.min(self.catalog.len())
    }

    /// Clean and embed a raw product name
    pub fn query(&self, raw: &str) -> Result<Query> {
        let cleaned = self.normalizer.normalize(raw);
        let embedding = encode_checked(&self.provider, &[cleaned.clone()], self.index.dim())?
            .pop()
            .ok_or_else(|| Error::Embedding("provider returned no vector".to_string()))?;

        Ok(Query {
            raw: raw.to_string(),
            cleaned,
            embedding,
        })
    }

    /// Score the retrieved candidates for `raw` and pick the winner
    pub fn explain(&self, raw: &str) -> Result<Explanation> {
        let query = self.query(raw)?;
        let hits = self.index.search(&query.embedding, self.effective_top_k())?;
        let candidates = self.reranker.score(&query.cleaned, &hits, &self.catalog)?;
        let best = select_best(&candidates)
            .map(|c| c.record_index)
            .ok_or_else(|| Error::InvalidConfig("no candidates to rerank".to_string()))?;

        Ok(Explanation {
            query,
            candidates,
            best,
        })
    }

    /// Closest catalog entry for a raw product name
    pub fn match_product(&self, raw: &str) -> Result<MatchResult> {
        let query = self.query(raw)?;
        let hits = self.index.search(&query.embedding, self.effective_top_k())?;
        let best = self.reranker.rerank(&query.cleaned, &hits, &self.catalog)?;
        let record = self.catalog.get(best).ok_or_else(|| {
            Error::IndexUnavailable(format!("row {} missing from catalog", best))
        })?;

        debug!(
            input = raw,
            cleaned = %query.cleaned,
            matched = %record.name,
            candidates = hits.len(),
            "matched"
        );

        Ok(MatchResult {
            input_product: raw.to_string(),
            matched_product: record.name.clone(),
            carbon_rating: record.carbon_rating.clone(),
        })
    }
}

/// Options for [`Matcher::match_batch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Per-item time budget. A match is synchronous and cannot be
    /// interrupted, so an item that finishes over budget is reported as
    /// [`Error::Timeout`] instead of being cut short.
    pub item_timeout: Option<Duration>,
}

/// Outcome of one batch input
#[derive(Debug)]
pub struct BatchItem {
    /// Position in the input slice
    pub position: usize,
    pub input: String,
    pub outcome: Result<MatchResult>,
    pub elapsed: Duration,
}

/// All outcomes of a batch, in input order
#[derive(Debug)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Successful results in input order
    pub fn matched(&self) -> impl Iterator<Item = &MatchResult> {
        self.items.iter().filter_map(|item| item.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.outcome.is_err())
    }

    pub fn success_count(&self) -> usize {
        self.matched().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Mean per-item match latency
    pub fn mean_latency(&self) -> Duration {
        if self.items.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.items.iter().map(|item| item.elapsed).sum();
        total / self.items.len() as u32
    }
}

impl<E: EmbeddingProvider + Sync> Matcher<E> {
    /// Match every input in parallel.
    ///
    /// A failing item is recorded in the report and does not stop the
    /// rest of the batch.
    pub fn match_batch<S>(&self, inputs: &[S], options: BatchOptions) -> BatchReport
    where
        S: AsRef<str> + Sync,
    {
        let started = Instant::now();

        let items: Vec<BatchItem> = inputs
            .par_iter()
            .enumerate()
            .map(|(position, input)| {
                let input = input.as_ref();
                let item_started = Instant::now();
                let mut outcome = self.match_product(input);
                let elapsed = item_started.elapsed();

                if let Some(limit) = options.item_timeout {
                    if elapsed > limit && outcome.is_ok() {
                        outcome = Err(Error::Timeout { elapsed, limit });
                    }
                }
                if let Err(e) = &outcome {
                    warn!(position, input, error = %e, "skipping item");
                }

                BatchItem {
                    position,
                    input: input.to_string(),
                    outcome,
                    elapsed,
                }
            })
            .collect();

        let report = BatchReport {
            items,
            elapsed: started.elapsed(),
        };
        info!(
            total = report.items.len(),
            failed = report.failure_count(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch finished"
        );
        report
    }
}
