//! Core domain models for pipelines
//!
//! This module defines the step contract, parameter values and schemas,
//! the step registry and the pipeline itself.

pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod step;
pub mod value;

pub use pipeline::*;
pub use registry::*;
pub use schema::*;
pub use step::*;
pub use value::*;
