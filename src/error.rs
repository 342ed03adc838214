//! Error types for configuration, pipelines and step execution

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, resolving or writing a configuration document
///
/// These are authoring or programming errors: they are fatal to the call that
/// raised them and are never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config format error: {0}")]
    ConfigFormat(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Step type '{0}' is not registered")]
    UnregisteredType(String),

    #[error("Duplicate key '{0}' after variant resolution")]
    DuplicateKey(String),

    #[error("Mixed key formats: keys {0:?} are not variant keys but other keys are")]
    MixedFormat(Vec<String>),

    #[error("Variant indices must be 0..{expected}, found {found:?}")]
    NonSequentialIndex { expected: usize, found: Vec<usize> },

    #[error("Missing required key '{0}'")]
    MissingKey(String),

    #[error("Unknown distribution '{0}'")]
    UnknownDistribution(String),

    #[error("Invalid arguments for distribution '{distribution}': {reason}")]
    InvalidDistributionArgs { distribution: String, reason: String },

    #[error("Failed to construct step '{step}': {source}")]
    Construction {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot serialize parameter '{0}': {1}")]
    Serialization(String, String),

    #[error("Invalid step name '{0}'")]
    InvalidStepName(String),

    #[error("Invalid configuration document: {0}")]
    InvalidDocument(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml")]
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by pipeline mutation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Invalid step '{name}': {reason}")]
    InvalidStep { name: String, reason: String },

    #[error("Pipeline is empty")]
    EmptyPipeline,
}

/// A step transform failed while processing an element
///
/// The `Display` output is the diagnostic stored by a lenient executor.
#[derive(Debug, Error)]
#[error("step {step} failed: {source}")]
pub struct StepFailure {
    pub step: String,
    #[source]
    pub source: anyhow::Error,
}

impl StepFailure {
    pub fn new(step: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            step: step.into(),
            source,
        }
    }
}

/// Errors raised by typed parameter accessors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' should be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}
