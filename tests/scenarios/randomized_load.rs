//! Test: Randomized Load - pools, ranges, distributions and variant groups

use crate::helpers::*;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use stepline::config::{ConfigEngine, LoadOptions};
use stepline::core::{ParamValue, SharedStep};
use stepline::error::ConfigError;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
    path
}

fn factor(step: &SharedStep<f64>) -> f64 {
    step.params().require_f64("factor").unwrap()
}

/// Test that a fixed seed makes randomized loads reproducible
#[test]
fn test_seeded_loads_are_reproducible() {
    init_tracing();
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "search.json",
        json!({
            "Scale": {"factor": {"distribution": "lognormal", "mean": 0.0, "sigma": 0.5}},
            "Clamp": {"bounds": "[(0, 1)]*2 + [(0, 5), (-1, 1)]"},
            "Smooth": {"size": [[3, 3], [5, 5], [7, 7]], "mode": ["edge", "wrap"]},
        }),
    );

    let options = LoadOptions::randomized(Some(42));
    let first = engine.load_with(&path, &options).unwrap();
    let second = engine.load_with(&path, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.iter().map(|step| step.name()).collect::<Vec<_>>(), vec!["Scale", "Clamp", "Smooth"]);
}

/// Test that randomized draws stay within their declared candidates
#[test]
fn test_randomized_values_come_from_candidates() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "search.json",
        json!({
            "Scale": {"factor": {"distribution": "uniform", "low": 1.0, "high": 2.0}},
            "Smooth": {"size": "[(3, 3)]*3 + [(5, 5)]", "mode": ["edge", "wrap"]},
        }),
    );

    let mut modes = HashSet::new();
    for seed in 0..50 {
        let steps = engine.load_with(&path, &LoadOptions::randomized(Some(seed))).unwrap();
        let value = factor(&steps[0]);
        assert!((1.0..=2.0).contains(&value), "factor {} outside [1, 2]", value);

        let smooth = steps[1].params();
        let size = smooth.get("size").unwrap();
        assert!(*size == ParamValue::tuple([3, 3]) || *size == ParamValue::tuple([5, 5]));
        modes.insert(smooth.require_str("mode").unwrap().to_string());
    }
    assert_eq!(modes.len(), 2);
}

/// Test that exact loads ignore randomness entirely
#[test]
fn test_exact_load_is_deterministic() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "search.json",
        json!({
            "Scale": {"factor": {"distribution": "gaussian", "loc": 1.5, "scale": 3.0}},
            "Scale__2": {"factor": "[0.25]*2 + [4.0]"},
        }),
    );

    let first = engine.load_with(&path, &LoadOptions::exact()).unwrap();
    let second = engine.load_with(&path, &LoadOptions::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(factor(&first[0]), 1.5);
    assert_eq!(factor(&first[1]), 0.25);
}

/// Test that variant groups keep one step per position in index order
#[test]
fn test_variant_groups() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "variants.json",
        json!({
            "Scale__I0F3": {"factor": 2.0},
            "Clamp__I0": {"bounds": [0, 1]},
            "Scale__I1__2": {"factor": 3.0},
        }),
    );

    let mut first_names = HashSet::new();
    for seed in 0..100 {
        let steps = engine.load_with(&path, &LoadOptions::randomized(Some(seed))).unwrap();
        assert_eq!(steps.len(), 2);
        first_names.insert(steps[0].name().to_string());
        assert_eq!(steps[1].name(), "Scale");
        assert_eq!(factor(&steps[1]), 3.0);
    }
    assert_eq!(first_names.len(), 2);
}

/// Test that malformed variant documents are rejected
#[test]
fn test_variant_document_errors() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let options = LoadOptions::randomized(Some(0));

    let mixed = write(dir.path(), "mixed.json", json!({"Scale__I0": {"factor": 1.0}, "Clamp": {}}));
    assert!(matches!(
        engine.load_with(&mixed, &options).unwrap_err(),
        ConfigError::MixedFormat(_)
    ));

    let gap = write(
        dir.path(),
        "gap.json",
        json!({"Scale__I0": {"factor": 1.0}, "Clamp__I2": {"bounds": [0, 1]}}),
    );
    assert!(matches!(
        engine.load_with(&gap, &options).unwrap_err(),
        ConfigError::NonSequentialIndex { .. }
    ));
}

/// Test that a malformed range string fails the load
#[test]
fn test_malformed_range_fails_load() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "bad.json", json!({"Scale": {"factor": "[1.0]+"}}));

    let err = engine.load_with(&path, &LoadOptions::exact()).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigFormat(_)));
}
