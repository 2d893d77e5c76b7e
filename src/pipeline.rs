//! File-level workflows: catalog CSV to saved index, saved index to matcher

use carbonmatch_core::{CatalogEntry, Result};
use carbonmatch_similarity::{
    EmbeddingProvider, Matcher, MatcherConfig, Normalizer, NormalizerConfig,
};
use carbonmatch_storage::{ArtifactStore, CatalogColumns, Manifest};
use std::path::Path;
use tracing::{debug, info};

/// Build a matcher over `entries` and persist it to `index_dir`
pub fn build_index<E: EmbeddingProvider>(
    entries: &[CatalogEntry],
    provider: E,
    config: MatcherConfig,
    index_dir: &Path,
) -> Result<(Matcher<E>, Manifest)> {
    build_index_with_normalizer(entries, provider, config, Normalizer::default(), index_dir)
}

/// Like [`build_index`] with a custom normalizer. Its settings are saved in
/// the manifest and restored by [`open_matcher`].
pub fn build_index_with_normalizer<E: EmbeddingProvider>(
    entries: &[CatalogEntry],
    provider: E,
    config: MatcherConfig,
    normalizer: Normalizer,
    index_dir: &Path,
) -> Result<(Matcher<E>, Manifest)> {
    let matcher = Matcher::build_with_normalizer(entries, provider, config, normalizer)?;
    let manifest = ArtifactStore::new(index_dir).save(
        matcher.catalog(),
        matcher.index(),
        matcher.provider().name(),
        matcher.normalizer().config(),
    )?;
    Ok((matcher, manifest))
}

/// Read the catalog CSV at `catalog_path`, then [`build_index`]
pub fn build_index_from_csv<E: EmbeddingProvider>(
    catalog_path: &Path,
    columns: &CatalogColumns,
    provider: E,
    config: MatcherConfig,
    index_dir: &Path,
) -> Result<(Matcher<E>, Manifest)> {
    let entries = carbonmatch_storage::load_catalog_csv(catalog_path, columns)?;
    info!(path = %catalog_path.display(), rows = entries.len(), "building index");
    build_index(&entries, provider, config, index_dir)
}

/// Load a saved index and attach `provider`.
///
/// The provider must match the one recorded in the manifest. Queries are
/// cleaned with the normalizer settings the catalog was built with.
pub fn open_matcher<E: EmbeddingProvider>(
    index_dir: &Path,
    provider: E,
    config: MatcherConfig,
) -> Result<Matcher<E>> {
    let artifacts = ArtifactStore::new(index_dir).load()?;
    let manifest = artifacts.manifest;
    manifest.ensure_provider(provider.name(), provider.dim())?;

    let matcher = Matcher::from_parts(artifacts.catalog, Some(artifacts.index), provider, config)?;
    match manifest.normalizer_config::<NormalizerConfig>()? {
        Some(settings) if &settings != matcher.normalizer().config() => {
            debug!(dir = %index_dir.display(), "restoring saved normalizer settings");
            Ok(matcher.with_normalizer(Normalizer::new(settings)?))
        }
        _ => Ok(matcher),
    }
}
