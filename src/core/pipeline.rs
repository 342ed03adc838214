//! Pipeline domain model

use crate::core::step::{is_valid_base_name, SharedStep, Step};
use crate::error::PipelineError;
use std::fmt;

/// An ordered sequence of step instances
///
/// Steps are immutable and shared, so replacing, appending or popping never
/// aliases state the caller can still mutate.
pub struct Pipeline<T> {
    steps: Vec<SharedStep<T>>,
}

impl<T> Pipeline<T> {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Create a pipeline from steps, validating each one
    pub fn from_steps<I>(steps: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = SharedStep<T>>,
    {
        let mut pipeline = Self::new();
        pipeline.set(steps)?;
        Ok(pipeline)
    }

    /// Replace every step
    ///
    /// Nothing changes if any step fails validation.
    pub fn set<I>(&mut self, steps: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = SharedStep<T>>,
    {
        let steps: Vec<SharedStep<T>> = steps.into_iter().collect();
        for step in &steps {
            validate_step(step.as_ref())?;
        }
        self.steps = steps;
        Ok(())
    }

    /// Add a step at the end
    pub fn append(&mut self, step: SharedStep<T>) -> Result<(), PipelineError> {
        validate_step(step.as_ref())?;
        self.steps.push(step);
        Ok(())
    }

    /// Remove and return the last step
    pub fn pop(&mut self) -> Result<SharedStep<T>, PipelineError> {
        self.steps.pop().ok_or(PipelineError::EmptyPipeline)
    }

    /// Remove every step
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn steps(&self) -> &[SharedStep<T>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Base names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }
}

/// Check that a step honors the step contract
///
/// Its name must be usable as a document key, and its parameters must match
/// the schema it declares.
pub fn validate_step<T>(step: &dyn Step<T>) -> Result<(), PipelineError> {
    let name = step.name();
    if !is_valid_base_name(name) {
        return Err(PipelineError::InvalidStep {
            name: name.to_string(),
            reason: "base name must be non-empty and must not contain '__'".to_string(),
        });
    }

    if let Some(schema) = step.schema() {
        schema
            .check(step.params())
            .map_err(|reason| PipelineError::InvalidStep {
                name: name.to_string(),
                reason,
            })?;
    }

    Ok(())
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PartialEq for Pipeline<T> {
    fn eq(&self, other: &Self) -> bool {
        self.steps == other.steps
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.steps.iter()).finish()
    }
}
