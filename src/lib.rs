//! stepline - Declarative, randomizable preprocessing pipelines

pub mod config;
pub mod core;
pub mod error;
pub mod execution;

// Re-export commonly used types
pub use crate::config::{ConfigDocument, ConfigEngine, DistributionSpec, LoadOptions, ParamSpec};
pub use crate::core::{ParamSchema, ParamValue, Parameters, Pipeline, SharedStep, Step, StepRegistry, TypeDescriptor};
pub use crate::error::{ConfigError, ParamError, PipelineError, StepFailure};
pub use crate::execution::{FailurePolicy, PipelineExecutor, Processed};
