//! Registry of constructible step types
//!
//! The host application builds a registry once at startup and then lends it,
//! read-only, to the serialization engine.

use crate::core::{
    schema::ParamSchema,
    step::{is_valid_base_name, SharedStep, Step},
    value::Parameters,
};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

type Constructor<T> = Box<dyn Fn(&Parameters) -> anyhow::Result<SharedStep<T>> + Send + Sync>;

/// One registered step type: its constructor and optional schema
pub struct RegisteredStep<T> {
    name: String,
    schema: Option<ParamSchema>,
    constructor: Constructor<T>,
}

impl<T> RegisteredStep<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&ParamSchema> {
        self.schema.as_ref()
    }

    /// Build an instance from resolved parameters
    pub fn construct(&self, params: &Parameters) -> anyhow::Result<SharedStep<T>> {
        (self.constructor)(params)
    }
}

impl<T> fmt::Debug for RegisteredStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredStep")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Mapping from base name to step constructor and schema
pub struct StepRegistry<T> {
    entries: HashMap<String, RegisteredStep<T>>,
}

impl<T: 'static> StepRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a step type with its parameter schema
    pub fn register<S, F>(
        &mut self,
        name: &str,
        schema: ParamSchema,
        constructor: F,
    ) -> Result<&mut Self, ConfigError>
    where
        S: Step<T> + 'static,
        F: Fn(&Parameters) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        self.insert(name, Some(schema), constructor)
    }

    /// Register a step type that declares no schema
    ///
    /// Loading such a step uses its parameters as decoded and logs a warning.
    pub fn register_without_schema<S, F>(&mut self, name: &str, constructor: F) -> Result<&mut Self, ConfigError>
    where
        S: Step<T> + 'static,
        F: Fn(&Parameters) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        self.insert(name, None, constructor)
    }

    fn insert<S, F>(
        &mut self,
        name: &str,
        schema: Option<ParamSchema>,
        constructor: F,
    ) -> Result<&mut Self, ConfigError>
    where
        S: Step<T> + 'static,
        F: Fn(&Parameters) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        if !is_valid_base_name(name) {
            return Err(ConfigError::InvalidStepName(name.to_string()));
        }

        let constructor: Constructor<T> =
            Box::new(move |params: &Parameters| Ok(Arc::new(constructor(params)?) as SharedStep<T>));
        let entry = RegisteredStep {
            name: name.to_string(),
            schema,
            constructor,
        };

        if self.entries.insert(name.to_string(), entry).is_some() {
            warn!("Step type '{}' registered twice, keeping the latest", name);
        } else {
            debug!("Registered step type '{}'", name);
        }
        Ok(self)
    }
}

impl<T> StepRegistry<T> {
    pub fn get(&self, name: &str) -> Option<&RegisteredStep<T>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered base names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<T: 'static> Default for StepRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StepRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish()
    }
}
