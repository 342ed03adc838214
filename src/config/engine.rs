//! Serialization engine: step instances to configuration documents and back

use crate::config::document::ConfigDocument;
use crate::config::spec::ParamSpec;
use crate::config::variants::select_variants;
use crate::core::{
    registry::{RegisteredStep, StepRegistry},
    schema::{coerce_params, TypeDescriptor},
    step::{SharedStep, KEY_SEPARATOR},
    value::{ParamValue, Parameters},
};
use crate::error::ConfigError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// How a document is turned back into step instances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Draw parameters from pools, ranges and distributions
    pub randomized: bool,

    /// Seed for every random choice; OS entropy when unset
    pub seed: Option<u64>,
}

impl LoadOptions {
    pub fn exact() -> Self {
        Self::default()
    }

    pub fn randomized(seed: Option<u64>) -> Self {
        Self {
            randomized: true,
            seed,
        }
    }
}

/// Base name of an entry key: everything before the first separator
pub fn base_name(key: &str) -> &str {
    key.split_once(KEY_SEPARATOR).map_or(key, |(base, _)| base)
}

/// Converts between step instances and configuration documents
///
/// The engine only reads the registry it borrows.
pub struct ConfigEngine<'r, T> {
    registry: &'r StepRegistry<T>,
}

impl<'r, T: 'static> ConfigEngine<'r, T> {
    pub fn new(registry: &'r StepRegistry<T>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r StepRegistry<T> {
        self.registry
    }

    /// Build the document for a list of steps
    ///
    /// Repeated base names get `__2`, `__3`, ... suffixes in order.
    pub fn to_document(&self, steps: &[SharedStep<T>]) -> Result<ConfigDocument, ConfigError> {
        let mut document = ConfigDocument::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for step in steps {
            let name = step.name();
            let entry = self.lookup(name)?;

            let count = seen.entry(name).or_insert(0);
            *count += 1;
            let key = if *count == 1 {
                name.to_string()
            } else {
                format!("{}{}{}", name, KEY_SEPARATOR, count)
            };

            if let Some(schema) = entry.schema() {
                schema
                    .check(step.params())
                    .map_err(|reason| ConfigError::SchemaMismatch(format!("step '{}': {}", name, reason)))?;
            }

            let mut params = Map::new();
            for (param, value) in step.params() {
                let template = entry.schema().and_then(|schema| schema.get(param));
                if let Some(path) = untyped_tuple(value, template, param) {
                    return Err(ConfigError::Serialization(
                        path,
                        "a tuple needs a declared type, without one it loads back as a list".to_string(),
                    ));
                }
                params.insert(param.clone(), ParamSpec::encode(value.to_json(param)?, template));
            }

            debug!("Serialized step '{}' as entry '{}'", name, key);
            document.insert(key, params);
        }

        Ok(document)
    }

    /// Write steps to `path`; `.yaml`/`.yml` paths are written as YAML
    pub fn save<P: AsRef<Path>>(&self, steps: &[SharedStep<T>], path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let document = self.to_document(steps)?;
        document.write_to(path)?;
        info!("Saved {} steps to {}", steps.len(), path.display());
        Ok(())
    }

    /// Rebuild step instances from a document, in entry order
    pub fn from_document<R: Rng + ?Sized>(
        &self,
        document: ConfigDocument,
        randomized: bool,
        rng: &mut R,
    ) -> Result<Vec<SharedStep<T>>, ConfigError> {
        let entries = select_variants(document.into_entries(), rng)?;
        let mut steps = Vec::with_capacity(entries.len());

        for (key, raw) in entries {
            let name = base_name(&key);
            let entry = self.lookup(name)?;
            let raw = match raw {
                Value::Object(raw) => raw,
                _ => {
                    return Err(ConfigError::InvalidDocument(format!(
                        "entry '{}' must map parameter names to specs",
                        key
                    )))
                }
            };

            let params = self.resolve_params(entry, raw, randomized, rng)?;
            let step = entry
                .construct(&params)
                .map_err(|source| ConfigError::Construction {
                    step: name.to_string(),
                    source,
                })?;

            debug!("Constructed step '{}' from entry '{}'", name, key);
            steps.push(step);
        }

        Ok(steps)
    }

    /// Read steps from `path`
    pub fn load<P, R>(&self, path: P, randomized: bool, rng: &mut R) -> Result<Vec<SharedStep<T>>, ConfigError>
    where
        P: AsRef<Path>,
        R: Rng + ?Sized,
    {
        let path = path.as_ref();
        info!(
            "Loading pipeline from {} ({})",
            path.display(),
            if randomized { "randomized" } else { "exact" }
        );
        let document = ConfigDocument::from_file(path)?;
        let steps = self.from_document(document, randomized, rng)?;
        info!("Loaded {} steps", steps.len());
        Ok(steps)
    }

    /// Read steps from `path` with a generator built from `options`
    pub fn load_with<P: AsRef<Path>>(
        &self,
        path: P,
        options: &LoadOptions,
    ) -> Result<Vec<SharedStep<T>>, ConfigError> {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.load(path, options.randomized, &mut rng)
    }

    fn lookup(&self, name: &str) -> Result<&'r RegisteredStep<T>, ConfigError> {
        self.registry
            .get(name)
            .ok_or_else(|| ConfigError::UnregisteredType(name.to_string()))
    }

    fn resolve_params<R: Rng + ?Sized>(
        &self,
        entry: &RegisteredStep<T>,
        raw: Map<String, Value>,
        randomized: bool,
        rng: &mut R,
    ) -> Result<Parameters, ConfigError> {
        let schema = entry.schema();

        let mut resolved = Map::new();
        for (param, spec) in raw {
            let template = schema.and_then(|schema| schema.get(&param));
            let value = ParamSpec::decode(spec, template)?.resolve(&param, randomized, rng)?;
            resolved.insert(param, value);
        }

        match schema {
            Some(schema) => coerce_params(&resolved, schema),
            None => {
                warn!(
                    "Step type '{}' has no parameter schema, using parameters as decoded",
                    entry.name()
                );
                Ok(resolved
                    .iter()
                    .map(|(param, value)| (param.clone(), ParamValue::from_json(value)))
                    .collect())
            }
        }
    }
}

/// Path of the first tuple no template covers
///
/// Untyped arrays decode as lists, so such a tuple cannot round trip.
fn untyped_tuple(value: &ParamValue, template: Option<&TypeDescriptor>, path: &str) -> Option<String> {
    match (value, template) {
        (_, Some(TypeDescriptor::Optional(inner))) => untyped_tuple(value, Some(&**inner), path),
        (ParamValue::Tuple(_), None) => Some(path.to_string()),
        (ParamValue::Tuple(items), Some(TypeDescriptor::Tuple(types)))
        | (ParamValue::List(items), Some(TypeDescriptor::Sequence(types))) => {
            items.iter().enumerate().find_map(|(i, item)| {
                untyped_tuple(item, types.get(i), &format!("{}[{}]", path, i))
            })
        }
        (ParamValue::Tuple(items) | ParamValue::List(items), _) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| untyped_tuple(item, None, &format!("{}[{}]", path, i))),
        (ParamValue::Map(map), Some(TypeDescriptor::Map(schema))) => map
            .iter()
            .find_map(|(key, item)| untyped_tuple(item, schema.get(key), &format!("{}.{}", path, key))),
        (ParamValue::Map(map), _) => map
            .iter()
            .find_map(|(key, item)| untyped_tuple(item, None, &format!("{}.{}", path, key))),
        _ => None,
    }
}
