//! Pipeline execution

pub mod executor;

pub use executor::{ElementStream, FailurePolicy, PipelineExecutor, Processed};
