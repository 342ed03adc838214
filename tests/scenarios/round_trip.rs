//! Test: Round Trip - saved pipelines load back exactly

use crate::helpers::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::BTreeMap;
use stepline::config::{ConfigDocument, ConfigEngine, LoadOptions};
use stepline::core::{ParamValue, Parameters, SharedStep};
use stepline::error::ConfigError;
use tempfile::TempDir;

fn sample_pipeline() -> Vec<SharedStep<f64>> {
    let border: BTreeMap<String, ParamValue> = [
        ("fill".to_string(), ParamValue::Float(0.5)),
        ("wrap".to_string(), ParamValue::Bool(false)),
    ]
    .into_iter()
    .collect();

    vec![
        Scale::shared(2.0),
        Smooth::shared(
            Parameters::new()
                .with("size", ParamValue::tuple([3, 5]))
                .with("mode", "['reflect']*2")
                .with("passes", ParamValue::Null)
                .with("border", border),
        ),
        Clamp::shared(0.0, 10.0),
        Scale::shared(0.5),
        Annotate::shared(
            Parameters::new()
                .with("tags", ParamValue::list(["train", "pcb"]))
                .with("note", "[draft]"),
        ),
    ]
}

/// Test that a pipeline saved as JSON loads back equal
#[test]
fn test_json_file_round_trip() {
    init_tracing();
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipeline.json");

    let steps = sample_pipeline();
    engine.save(&steps, &path).unwrap();

    let loaded = engine.load_with(&path, &LoadOptions::exact()).unwrap();
    assert_eq!(loaded, steps);

    // Second Scale is disambiguated on disk only
    let doc = ConfigDocument::from_file(&path).unwrap();
    assert_eq!(
        doc.keys().collect::<Vec<_>>(),
        vec!["Scale", "Smooth", "Clamp", "Scale__2", "Annotate"]
    );
    assert!(loaded.iter().all(|step| !step.name().contains("__")));
}

/// Test that YAML files round trip the same way
#[cfg(feature = "yaml")]
#[test]
fn test_yaml_file_round_trip() {
    init_tracing();
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipeline.yaml");

    let steps = sample_pipeline();
    engine.save(&steps, &path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("Scale__2"));
    assert!(!content.trim_start().starts_with('{'));

    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(engine.load(&path, false, &mut rng).unwrap(), steps);
}

/// Test that concrete strings that look like ranges survive a round trip
#[test]
fn test_bracket_strings_are_wrapped_on_save() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);

    let doc = engine.to_document(&sample_pipeline()).unwrap();
    assert_eq!(doc.get("Smooth").unwrap()["mode"], json!(["['reflect']*2"]));
    assert_eq!(doc.get("Smooth").unwrap()["size"], json!([3, 5]));
    assert_eq!(doc.get("Annotate").unwrap()["note"], json!(["[draft]"]));
    assert_eq!(doc.get("Annotate").unwrap()["tags"], json!([["train", "pcb"]]));
}

/// Test that bracketed text for a string parameter loads and saves as plain text
#[test]
fn test_bracketed_label_stays_text() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let doc = ConfigDocument::from_json(r#"{"Smooth": {"size": [3, 3], "mode": "[defect] scratch"}}"#).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let steps = engine.from_document(doc, true, &mut rng).unwrap();
    assert_eq!(steps[0].params().require_str("mode").unwrap(), "[defect] scratch");

    let saved = engine.to_document(&steps).unwrap();
    assert_eq!(saved.get("Smooth").unwrap()["mode"], json!("[defect] scratch"));
}

/// Test that an empty pipeline saves to an empty document
#[test]
fn test_empty_pipeline_round_trip() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");

    engine.save(&[], &path).unwrap();
    assert!(engine.load_with(&path, &LoadOptions::exact()).unwrap().is_empty());
}

/// Test that saving a step with an unregistered name fails before writing
#[test]
fn test_save_unregistered_step_writes_nothing() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipeline.json");

    let mut empty = stepline::core::StepRegistry::<f64>::new();
    empty
        .register("Scale", Scale::schema(), Scale::from_params)
        .unwrap();
    let err = ConfigEngine::new(&empty).save(&sample_pipeline(), &path).unwrap_err();

    assert!(matches!(err, ConfigError::UnregisteredType(name) if name == "Smooth"));
    assert!(!path.exists());
    assert_eq!(engine.registry().len(), 5);
}

/// Test that a step constructor rejecting loaded parameters is reported by name
#[test]
fn test_constructor_rejection_on_load() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let doc = ConfigDocument::from_json(r#"{"Clamp": {"bounds": [5, 1]}}"#).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let err = engine.from_document(doc, false, &mut rng).unwrap_err();
    match err {
        ConfigError::Construction { step, source } => {
            assert_eq!(step, "Clamp");
            assert!(source.to_string().contains("exceeds"));
        }
        other => panic!("Expected Construction error, got {:?}", other),
    }
}
