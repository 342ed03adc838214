//! Test: Executor Policy - strict and lenient handling of step failures

use crate::helpers::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use stepline::config::{ConfigDocument, ConfigEngine};
use stepline::error::PipelineError;
use stepline::execution::{FailurePolicy, PipelineExecutor};

fn failing_executor(policy: FailurePolicy) -> PipelineExecutor<f64> {
    let mut executor = PipelineExecutor::new(policy);
    executor
        .set(vec![Scale::shared(2.0), Explode::shared("sensor offline"), Scale::shared(3.0)])
        .unwrap();
    executor
}

/// Test that lenient mode returns the sentinel with a diagnostic naming the step
#[test]
fn test_lenient_second_step_failure() {
    init_tracing();
    let mut executor = failing_executor(FailurePolicy::Lenient);

    let processed = executor.process(vec![1.0, 2.0]).unwrap();
    assert!(processed.is_no_result());

    let diagnostic = executor.diagnostic().unwrap();
    assert_eq!(diagnostic, "step Explode failed: sensor offline");
}

/// Test that strict mode propagates the same failure instead
#[test]
fn test_strict_second_step_failure() {
    init_tracing();
    let mut executor = failing_executor(FailurePolicy::Strict);

    let failure = executor.process(vec![1.0, 2.0]).unwrap_err();
    assert_eq!(failure.step, "Explode");
    assert_eq!(failure.source.to_string(), "sensor offline");
    assert_eq!(executor.run(vec![1.0]).unwrap_err().step, "Explode");
}

/// Test that a loaded pipeline runs like the one it was saved from
#[test]
fn test_loaded_pipeline_runs() {
    let registry = registry();
    let engine = ConfigEngine::new(&registry);
    let doc = ConfigDocument::from_json(
        r#"{
            "Scale": {"factor": 4},
            "Clamp": {"bounds": [0, 10]},
            "Scale__2": {"factor": "[0.5]"}
        }"#,
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let steps = engine.from_document(doc, false, &mut rng).unwrap();

    let mut executor = PipelineExecutor::strict();
    executor.set(steps).unwrap();
    assert_eq!(executor.pipeline().names(), vec!["Scale", "Clamp", "Scale"]);
    assert_eq!(executor.run(vec![1.0, 2.0, 3.0]).unwrap(), Some(vec![2.0, 4.0, 5.0]));
}

/// Test that payloads are transformed and auxiliary values carried along
#[test]
fn test_paired_stream() {
    let mut executor = PipelineExecutor::strict();
    executor.set(vec![Scale::shared(10.0), Clamp::shared(0.0, 25.0)]).unwrap();

    let labels = vec!["ok", "defect", "ok"];
    let samples = vec![1.0, 2.0, 3.0];
    let output = executor
        .process_paired(samples.into_iter().zip(labels))
        .unwrap()
        .into_stream()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(output, vec![(10.0, "ok"), (20.0, "defect"), (25.0, "ok")]);
}

/// Test that a failure past the first element surfaces when it is pulled
#[test]
fn test_lazy_failure_surfaces_while_pulling() {
    let mut executor = PipelineExecutor::lenient();
    executor.set(vec![Clamp::shared(0.0, 1.0), Scale::shared(2.0)]).unwrap();

    let stream = executor
        .process(vec![0.5, f64::NAN, 0.25])
        .unwrap()
        .into_stream()
        .unwrap();
    let results: Vec<_> = stream.collect();

    assert_eq!(results.len(), 2);
    assert_eq!(*results[0].as_ref().unwrap(), 1.0);
    assert_eq!(results[1].as_ref().unwrap_err().step, "Clamp");
}

/// Test mutation through the executor: set, append, pop, clear
#[test]
fn test_pipeline_mutation() {
    let mut executor = PipelineExecutor::strict();
    let base = vec![Scale::shared(2.0), Clamp::shared(0.0, 1.0)];
    executor.set(base.clone()).unwrap();
    let before = executor.pipeline().clone();

    let extra = Scale::shared(5.0);
    executor.append(extra.clone()).unwrap();
    assert!(executor.pop().unwrap() == extra);
    assert_eq!(executor.pipeline(), &before);

    executor.clear();
    assert_eq!(executor.pop().unwrap_err(), PipelineError::EmptyPipeline);
}
