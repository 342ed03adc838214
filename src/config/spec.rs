//! Parameter specs: the four encodings of a parameter in a document
//!
//! | JSON shape                                   | spec           |
//! |----------------------------------------------|----------------|
//! | string starting with `[`                     | range          |
//! | object with a `distribution` key             | distribution   |
//! | array deeper than the parameter's type       | candidate pool |
//! | anything else                                | concrete value |
//!
//! A parameter without a declared type treats every array as a pool. A
//! string parameter whose text starts with `[` but is not a valid range
//! expression is kept as a concrete string.

use crate::config::distribution::{DistributionSpec, DISTRIBUTION_KEY};
use crate::config::range;
use crate::core::schema::TypeDescriptor;
use crate::error::ConfigError;
use rand::Rng;
use serde_json::Value;

/// A decoded parameter spec
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    Concrete(Value),
    Pool(Vec<Value>),
    Distribution(DistributionSpec),
    Range { expr: String, values: Vec<Value> },
}

impl ParamSpec {
    /// Decode a raw document value, using the parameter's type to tell a
    /// concrete sequence from a pool of candidates
    pub fn decode(raw: Value, template: Option<&TypeDescriptor>) -> Result<Self, ConfigError> {
        match raw {
            Value::String(expr) if range::looks_like_range(&expr) => match range::parse(&expr) {
                Ok(values) => Ok(ParamSpec::Range { expr, values }),
                Err(_) if is_text(template) => Ok(ParamSpec::Concrete(Value::String(expr))),
                Err(err) => Err(err),
            },
            Value::Object(map) if map.contains_key(DISTRIBUTION_KEY) => {
                DistributionSpec::from_descriptor(&map).map(ParamSpec::Distribution)
            }
            Value::Array(items) if is_pool(&items, template) => Ok(ParamSpec::Pool(items)),
            other => Ok(ParamSpec::Concrete(other)),
        }
    }

    /// Encode a concrete value so that decoding it yields the same value
    ///
    /// Values that would otherwise read back as a range, a distribution or a
    /// pool are wrapped in a one-element pool.
    pub fn encode(value: Value, template: Option<&TypeDescriptor>) -> Value {
        match ParamSpec::decode(value.clone(), template) {
            Ok(ParamSpec::Concrete(_)) => value,
            _ => Value::Array(vec![value]),
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, ParamSpec::Concrete(_))
    }

    /// Turn the parameter spec into one raw value
    ///
    /// Without randomization pools and ranges yield their first candidate and
    /// distributions their mean.
    pub fn resolve<R: Rng + ?Sized>(self, name: &str, randomized: bool, rng: &mut R) -> Result<Value, ConfigError> {
        match self {
            ParamSpec::Concrete(value) => Ok(value),
            ParamSpec::Pool(items) => choose(items, name, randomized, rng),
            ParamSpec::Range { values, .. } => choose(values, name, randomized, rng),
            ParamSpec::Distribution(spec) if randomized => spec.sample(rng),
            ParamSpec::Distribution(spec) => Ok(spec.mean()),
        }
    }
}

fn is_text(template: Option<&TypeDescriptor>) -> bool {
    match template {
        Some(TypeDescriptor::Str) => true,
        Some(TypeDescriptor::Optional(inner)) => is_text(Some(&**inner)),
        _ => false,
    }
}

fn is_pool(items: &[Value], template: Option<&TypeDescriptor>) -> bool {
    match template {
        None => true,
        Some(ty) => array_depth(items) > ty.sequence_depth(),
    }
}

fn array_depth(items: &[Value]) -> usize {
    let nested = items
        .iter()
        .filter_map(|item| item.as_array().map(|inner| array_depth(inner)))
        .max();
    1 + nested.unwrap_or(0)
}

fn choose<R: Rng + ?Sized>(
    mut candidates: Vec<Value>,
    name: &str,
    randomized: bool,
    rng: &mut R,
) -> Result<Value, ConfigError> {
    if candidates.is_empty() {
        return Err(ConfigError::ConfigFormat(format!(
            "parameter '{}' has no candidate values",
            name
        )));
    }
    let index = if randomized {
        rng.random_range(0..candidates.len())
    } else {
        0
    };
    Ok(candidates.swap_remove(index))
}
