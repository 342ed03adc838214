//! Pipeline executor - applies steps to a lazily pulled element stream

use crate::core::{Pipeline, SharedStep, Step};
use crate::error::{PipelineError, StepFailure};
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use tracing::{debug, error, info, warn};

/// What the executor does when a step fails on an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the failure to the caller
    #[default]
    Strict,
    /// Record a diagnostic and return [`Processed::NoResult`]
    Lenient,
}

/// Stream of processed elements
///
/// Failures on elements that were not forced during `process` show up here,
/// and the stream ends after the first one.
pub type ElementStream<'a, U> = Box<dyn Iterator<Item = Result<U, StepFailure>> + 'a>;

/// Outcome of a `process` call
pub enum Processed<'a, U> {
    Stream(ElementStream<'a, U>),
    /// A step failed under the lenient policy
    NoResult,
}

impl<'a, U> Processed<'a, U> {
    pub fn is_no_result(&self) -> bool {
        matches!(self, Processed::NoResult)
    }

    pub fn into_stream(self) -> Option<ElementStream<'a, U>> {
        match self {
            Processed::Stream(stream) => Some(stream),
            Processed::NoResult => None,
        }
    }
}

impl<U> std::fmt::Debug for Processed<'_, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Processed::Stream(_) => f.write_str("Processed::Stream(..)"),
            Processed::NoResult => f.write_str("Processed::NoResult"),
        }
    }
}

/// Holds a pipeline and runs it under a fixed failure policy
pub struct PipelineExecutor<T> {
    pipeline: Pipeline<T>,
    policy: FailurePolicy,
    diagnostic: Option<String>,
}

impl<T: 'static> PipelineExecutor<T> {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            pipeline: Pipeline::new(),
            policy,
            diagnostic: None,
        }
    }

    pub fn strict() -> Self {
        Self::new(FailurePolicy::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(FailurePolicy::Lenient)
    }

    pub fn with_pipeline(policy: FailurePolicy, pipeline: Pipeline<T>) -> Self {
        Self {
            pipeline,
            policy,
            diagnostic: None,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn pipeline(&self) -> &Pipeline<T> {
        &self.pipeline
    }

    /// Diagnostic left by the last lenient failure, cleared on every run
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Replace every step, validating each one
    pub fn set<I>(&mut self, steps: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = SharedStep<T>>,
    {
        self.pipeline.set(steps)
    }

    pub fn append(&mut self, step: SharedStep<T>) -> Result<(), PipelineError> {
        self.pipeline.append(step)
    }

    pub fn pop(&mut self) -> Result<SharedStep<T>, PipelineError> {
        self.pipeline.pop()
    }

    pub fn clear(&mut self) {
        self.pipeline.clear();
    }

    /// Apply every step, in order, to each element of `input`
    pub fn process<'a, I>(&mut self, input: I) -> Result<Processed<'a, T>, StepFailure>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        self.drive(input.into_iter(), |step, element| step.apply(element))
    }

    /// Like [`process`](Self::process) for `(payload, aux)` elements
    ///
    /// Steps only see the payload; each aux value is re-paired with its
    /// transformed payload.
    pub fn process_paired<'a, A, I>(&mut self, input: I) -> Result<Processed<'a, (T, A)>, StepFailure>
    where
        A: 'a,
        I: IntoIterator<Item = (T, A)>,
        I::IntoIter: 'a,
    {
        self.drive(input.into_iter(), |step, (payload, aux)| {
            step.apply(payload).map(|payload| (payload, aux))
        })
    }

    /// Process and collect the whole stream
    ///
    /// Returns `Ok(None)` where `process` would return the sentinel, including
    /// for a lenient failure found while collecting.
    pub fn run<I>(&mut self, input: I) -> Result<Option<Vec<T>>, StepFailure>
    where
        I: IntoIterator<Item = T>,
    {
        let stream = match self.process(input)? {
            Processed::Stream(stream) => stream,
            Processed::NoResult => return Ok(None),
        };

        match stream.collect::<Result<Vec<T>, _>>() {
            Ok(elements) => Ok(Some(elements)),
            Err(failure) => self.fail(failure).map(|()| None),
        }
    }

    fn drive<'a, U, F>(&mut self, input: impl Iterator<Item = U> + 'a, apply: F) -> Result<Processed<'a, U>, StepFailure>
    where
        U: 'a,
        F: Fn(&dyn Step<T>, U) -> anyhow::Result<U> + Copy + 'a,
    {
        self.diagnostic = None;
        info!("Processing stream through {} steps", self.pipeline.len());

        let steps = self.pipeline.steps().to_vec();
        let mut stream: ElementStream<'a, U> = Box::new(input.map(Ok));
        for step in steps {
            debug!("Applying step: {}", step.name());
            let mut mapped = stream
                .map(move |item| {
                    item.and_then(|element| {
                        apply(step.as_ref(), element).map_err(|source| StepFailure::new(step.name(), source))
                    })
                })
                .peekable();

            if let Some(failure) = force_head(&mut mapped) {
                self.fail(failure)?;
                return Ok(Processed::NoResult);
            }
            stream = Box::new(mapped);
        }

        Ok(Processed::Stream(Box::new(HaltOnError {
            inner: stream,
            halted: false,
        })))
    }

    fn fail(&mut self, failure: StepFailure) -> Result<(), StepFailure> {
        match self.policy {
            FailurePolicy::Strict => {
                error!("{}", failure);
                Err(failure)
            }
            FailurePolicy::Lenient => {
                warn!("{}, skipping remaining steps", failure);
                self.diagnostic = Some(failure.to_string());
                Ok(())
            }
        }
    }
}

impl<T: 'static> Default for PipelineExecutor<T> {
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

/// Evaluate the first element, taking it out only if it failed
fn force_head<U, I>(stream: &mut Peekable<I>) -> Option<StepFailure>
where
    I: Iterator<Item = Result<U, StepFailure>>,
{
    match stream.peek() {
        Some(Err(_)) => stream.next().and_then(Result::err),
        _ => None,
    }
}

struct HaltOnError<I> {
    inner: I,
    halted: bool,
}

impl<U, I> Iterator for HaltOnError<I>
where
    I: Iterator<Item = Result<U, StepFailure>>,
{
    type Item = Result<U, StepFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }
        let item = self.inner.next()?;
        self.halted = item.is_err();
        Some(item)
    }
}
