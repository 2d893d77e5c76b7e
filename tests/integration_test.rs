// Integration tests for carbonmatch
use carbonmatch::prelude::*;
use carbonmatch::{
    build_index, build_index_from_csv, build_index_with_normalizer, evaluate, open_matcher, Manifest,
    Normalizer, NormalizerConfig,
};
use carbonmatch_storage::{load_results, save_results};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CATALOG_CSV: &str = "\
name,clean name,carbon_rating
Cherry Tomatoes,cherry tomatoes,A
Whole Milk,whole milk,C
Oat Milk,oat milk,A
Cheddar Cheese,cheddar cheese,E
Cappuccino,cappuccino,D
Asparagus,asparagus,B
Beef Mince,beef mince,E
Basil,basil,B
";

const INPUT_CSV: &str = "\
product_name
Fresh Cherry Toms 250g
Organic Cappuc 250ml
Oat Milk Barista 1L
Mature Cheddar 400g
500g
";

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn built_index(dir: &Path) -> Manifest {
    let catalog = write(dir, "catalog.csv", CATALOG_CSV);
    let (_, manifest) = build_index_from_csv(
        &catalog,
        &CatalogColumns::default(),
        HashingEmbedder::default(),
        MatcherConfig::default(),
        &dir.join("index"),
    )
    .unwrap();
    manifest
}

#[test]
fn test_build_save_load_match() {
    let dir = tempdir().unwrap();
    let manifest = built_index(dir.path());
    assert_eq!(manifest.rows, 8);
    assert_eq!(manifest.provider, "hashing-trigram-v1");

    let matcher = open_matcher(
        &dir.path().join("index"),
        HashingEmbedder::default(),
        MatcherConfig::default(),
    )
    .unwrap();

    let cases = [
        ("Fresh Cherry Toms 250g", "Cherry Tomatoes", "A"),
        ("Organic Cappuc 250ml", "Cappuccino", "D"),
        ("Oat Milk Barista 1L", "Oat Milk", "A"),
        ("Mature Cheddar 400g", "Cheddar Cheese", "E"),
    ];
    for (input, product, rating) in cases {
        let result = matcher.match_product(input).unwrap();
        assert_eq!(result.input_product, input);
        assert_eq!(result.matched_product, product, "input {:?}", input);
        assert_eq!(result.carbon_rating, rating);
    }
}

#[test]
fn test_loaded_matcher_agrees_with_fresh_build() {
    let dir = tempdir().unwrap();
    let entries = vec![
        CatalogEntry::new("tomato", "tomato", "A"),
        CatalogEntry::new("tomatoes fresh", "tomatoes fresh", "A"),
        CatalogEntry::new("basil", "basil", "B"),
    ];
    let (fresh, _) = build_index(
        &entries,
        HashingEmbedder::default(),
        MatcherConfig::default(),
        dir.path(),
    )
    .unwrap();
    let loaded = open_matcher(dir.path(), HashingEmbedder::default(), MatcherConfig::default()).unwrap();

    for q in ["Fresh Tomatoes 500g", "basil leaves", "tomato puree", "xyz"] {
        assert_eq!(loaded.match_product(q).unwrap(), fresh.match_product(q).unwrap());
    }
    assert_eq!(loaded.match_product("Fresh Tomatoes 500g").unwrap().carbon_rating, "A");
}

#[test]
fn test_saved_index_keeps_custom_normalizer() {
    let dir = tempdir().unwrap();
    let mut settings = NormalizerConfig::default();
    settings.abbreviations.push(("choc".to_string(), "chocolate".to_string()));
    settings.generic_prefixes.push("luxury".to_string());

    let entries = vec![
        CatalogEntry::new("Chocolate Bar", "chocolate bar", "C"),
        CatalogEntry::new("Cocoa Powder", "cocoa powder", "D"),
        CatalogEntry::new("Oat Bar", "oat bar", "B"),
    ];
    let (fresh, manifest) = build_index_with_normalizer(
        &entries,
        HashingEmbedder::default(),
        MatcherConfig::default(),
        Normalizer::new(settings.clone()).unwrap(),
        dir.path(),
    )
    .unwrap();
    assert!(manifest.normalizer.is_some());

    let loaded = open_matcher(dir.path(), HashingEmbedder::default(), MatcherConfig::default()).unwrap();
    assert_eq!(loaded.normalizer().config(), &settings);
    assert_eq!(loaded.normalizer().normalize("Luxury Choc Bar"), "chocolate bar");

    for q in ["Luxury Choc Bar 100g", "choc", "oat bar", "cocoa"] {
        assert_eq!(loaded.match_product(q).unwrap(), fresh.match_product(q).unwrap(), "query {:?}", q);
    }
    let result = loaded.match_product("Luxury Choc Bar 100g").unwrap();
    assert_eq!(result.matched_product, "Chocolate Bar");
    assert_eq!(result.carbon_rating, "C");
}

#[test]
fn test_batch_file_flow_and_evaluation() {
    let dir = tempdir().unwrap();
    built_index(dir.path());
    let matcher = open_matcher(
        &dir.path().join("index"),
        HashingEmbedder::default(),
        MatcherConfig::default(),
    )
    .unwrap();

    let input = write(dir.path(), "input.csv", INPUT_CSV);
    let names = carbonmatch_storage::load_product_names(&input, "product_name").unwrap();
    assert_eq!(names.len(), 5);

    let report = matcher.match_batch(&names, BatchOptions::default());
    // "500g" cleans to nothing but still gets a catalog row.
    assert_eq!(report.success_count(), 5);
    assert_eq!(report.failure_count(), 0);

    let output = dir.path().join("output.csv");
    let results: Vec<MatchResult> = report.matched().cloned().collect();
    assert_eq!(results[4].input_product, "500g");
    assert!(CATALOG_CSV.lines().any(|l| l.starts_with(&format!("{},", results[4].matched_product))));
    save_results(&output, &results).unwrap();
    let written = load_results(&output).unwrap();
    assert_eq!(written, results);

    let truth = write(
        dir.path(),
        "ground-truth.csv",
        "\
input_product,matched_product,carbon_rating
Fresh Cherry Toms 250g,Cherry Tomatoes,A
Organic Cappuc 250ml,Cappuccino,D
Oat Milk Barista 1L,Oat Milk,A
Mature Cheddar 400g,Cheddar Cheese,B
",
    );
    let evaluation = evaluate(&load_results(&truth).unwrap(), &written).unwrap();
    assert_eq!(evaluation.total, 4);
    assert_eq!(evaluation.correct, 3);
    assert!((evaluation.accuracy() - 75.0).abs() < 1e-9);
}

#[test]
fn test_catalog_missing_column() {
    let dir = tempdir().unwrap();
    let catalog = write(dir.path(), "catalog.csv", "name,carbon_rating\nBasil,B\n");
    let err = build_index_from_csv(
        &catalog,
        &CatalogColumns::default(),
        HashingEmbedder::default(),
        MatcherConfig::default(),
        &dir.path().join("index"),
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::Schema(_)));
    assert!(!dir.path().join("index").exists());
}

#[test]
fn test_corrupt_index_is_unavailable() {
    let dir = tempdir().unwrap();
    built_index(dir.path());
    let index_dir = dir.path().join("index");

    fs::write(index_dir.join("embeddings.bin"), b"not a matrix").unwrap();
    let err = open_matcher(&index_dir, HashingEmbedder::default(), MatcherConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::IndexUnavailable(_)));
}

#[test]
fn test_missing_index_is_unavailable() {
    let dir = tempdir().unwrap();
    let err = open_matcher(dir.path(), HashingEmbedder::default(), MatcherConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::IndexUnavailable(_)));
}

#[test]
fn test_provider_dimension_must_match_index() {
    let dir = tempdir().unwrap();
    built_index(dir.path());
    let err = open_matcher(
        &dir.path().join("index"),
        HashingEmbedder::new(64).unwrap(),
        MatcherConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn test_rebuild_replaces_previous_index() {
    let dir = tempdir().unwrap();
    built_index(dir.path());
    let index_dir = dir.path().join("index");

    let entries = vec![CatalogEntry::new("Basil", "basil", "B"), CatalogEntry::new("Kale", "kale", "A")];
    build_index(&entries, HashingEmbedder::default(), MatcherConfig::default(), &index_dir).unwrap();

    let matcher = open_matcher(&index_dir, HashingEmbedder::default(), MatcherConfig::default()).unwrap();
    assert_eq!(matcher.catalog().len(), 2);
    assert_eq!(matcher.match_product("curly kale").unwrap().carbon_rating, "A");
}
