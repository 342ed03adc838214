//! Step contract

use crate::core::{schema::ParamSchema, value::Parameters};
use std::fmt;
use std::sync::Arc;

/// Separator between a base name and any suffix in a document entry key
pub const KEY_SEPARATOR: &str = "__";

/// A named, parameterized transformation over one pipeline element
///
/// Implementations must be deterministic given their parameters: the same
/// parameters and input element always produce the same output or the same
/// failure. Steps hold no state across elements.
pub trait Step<T>: fmt::Debug + Send + Sync {
    /// Base name of the step type, the key it is registered under
    fn name(&self) -> &str;

    /// Parameters this instance was constructed with
    fn params(&self) -> &Parameters;

    /// Parameter schema of the step type, if it declares one
    fn schema(&self) -> Option<ParamSchema> {
        None
    }

    /// Transform one element
    fn apply(&self, input: T) -> anyhow::Result<T>;
}

/// Steps are immutable once built, so pipelines share them by reference count
pub type SharedStep<T> = Arc<dyn Step<T>>;

impl<T> PartialEq for dyn Step<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.params() == other.params()
    }
}

/// Check that a name can be used as a base name in entry keys
pub fn is_valid_base_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(KEY_SEPARATOR)
}
