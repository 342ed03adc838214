//! Parameter schemas and type coercion
//!
//! A schema is declared once per step type. Coercion converts raw decoded
//! document values into typed [`ParamValue`]s following the schema.

use crate::core::value::{ParamValue, Parameters};
use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Expected shape of one parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Bool,
    Int,
    Float,
    Str,
    /// `null` or the inner type
    Optional(Box<TypeDescriptor>),
    /// Fixed-arity ordered group, coerced to `ParamValue::Tuple`
    Tuple(Vec<TypeDescriptor>),
    /// Ordered sequence, coerced to `ParamValue::List`
    Sequence(Vec<TypeDescriptor>),
    /// Nested name -> type mapping
    Map(ParamSchema),
}

impl TypeDescriptor {
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    /// How many array levels a concrete value of this type has
    pub fn sequence_depth(&self) -> usize {
        match self {
            TypeDescriptor::Tuple(items) | TypeDescriptor::Sequence(items) => {
                1 + items.iter().map(Self::sequence_depth).max().unwrap_or(0)
            }
            TypeDescriptor::Optional(inner) => inner.sequence_depth(),
            _ => 0,
        }
    }

    /// Check that an already-typed value has this shape
    pub fn conforms(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (TypeDescriptor::Bool, ParamValue::Bool(_))
            | (TypeDescriptor::Int, ParamValue::Int(_))
            | (TypeDescriptor::Float, ParamValue::Float(_))
            | (TypeDescriptor::Str, ParamValue::Str(_)) => true,
            (TypeDescriptor::Optional(_), ParamValue::Null) => true,
            (TypeDescriptor::Optional(inner), other) => inner.conforms(other),
            (TypeDescriptor::Tuple(types), ParamValue::Tuple(items))
            | (TypeDescriptor::Sequence(types), ParamValue::List(items)) => {
                types.len() == items.len() && types.iter().zip(items).all(|(t, v)| t.conforms(v))
            }
            (TypeDescriptor::Map(schema), ParamValue::Map(map)) => map
                .iter()
                .all(|(key, item)| schema.get(key).map_or(true, |t| t.conforms(item))),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Bool => write!(f, "bool"),
            TypeDescriptor::Int => write!(f, "int"),
            TypeDescriptor::Float => write!(f, "float"),
            TypeDescriptor::Str => write!(f, "str"),
            TypeDescriptor::Optional(inner) => write!(f, "{}?", inner),
            TypeDescriptor::Tuple(items) => write!(f, "({})", join(items)),
            TypeDescriptor::Sequence(items) => write!(f, "[{}]", join(items)),
            TypeDescriptor::Map(schema) => {
                let fields: Vec<String> = schema
                    .iter()
                    .map(|(name, ty)| format!("{}: {}", name, ty))
                    .collect();
                write!(f, "{{{}}}", fields.join(", "))
            }
        }
    }
}

fn join(items: &[TypeDescriptor]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered mapping from parameter name to its expected type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSchema {
    fields: Vec<(String, TypeDescriptor)>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style field declaration; redeclaring a name replaces it
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = ty,
            None => self.fields.push((name, ty)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDescriptor)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check already-typed parameters against the schema
    ///
    /// Parameters without a declared type are accepted as-is.
    pub fn check(&self, params: &Parameters) -> Result<(), String> {
        for (name, value) in params {
            if let Some(ty) = self.get(name) {
                if !ty.conforms(value) {
                    return Err(format!(
                        "parameter '{}' should be {}, got {}",
                        name,
                        ty,
                        value.kind()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Coerce a raw decoded value to the shape of `template`
pub fn coerce(raw: &Value, template: &TypeDescriptor) -> Result<ParamValue, ConfigError> {
    coerce_at(raw, template, "value")
}

/// Coerce all of a step's raw parameters against its schema
///
/// Raw keys the schema does not mention are converted without a template;
/// schema keys missing from `raw` are left out of the result.
pub fn coerce_params(raw: &Map<String, Value>, schema: &ParamSchema) -> Result<Parameters, ConfigError> {
    Ok(coerce_fields(raw, schema, "")?.into_iter().collect())
}

fn coerce_fields(
    raw: &Map<String, Value>,
    schema: &ParamSchema,
    prefix: &str,
) -> Result<BTreeMap<String, ParamValue>, ConfigError> {
    let mut result = BTreeMap::new();
    for (key, value) in raw {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let converted = match schema.get(key) {
            Some(ty) => coerce_at(value, ty, &path)?,
            None => ParamValue::from_json(value),
        };
        result.insert(key.clone(), converted);
    }
    Ok(result)
}

fn coerce_at(raw: &Value, template: &TypeDescriptor, path: &str) -> Result<ParamValue, ConfigError> {
    let mismatch = || {
        ConfigError::SchemaMismatch(format!(
            "'{}' expected {}, got {}",
            path,
            template,
            describe(raw)
        ))
    };

    match template {
        TypeDescriptor::Bool => coerce_bool(raw).map(ParamValue::Bool).ok_or_else(mismatch),
        TypeDescriptor::Int => coerce_int(raw).map(ParamValue::Int).ok_or_else(mismatch),
        TypeDescriptor::Float => coerce_float(raw).map(ParamValue::Float).ok_or_else(mismatch),
        TypeDescriptor::Str => coerce_str(raw).map(ParamValue::Str).ok_or_else(mismatch),
        TypeDescriptor::Optional(inner) => match raw {
            Value::Null => Ok(ParamValue::Null),
            other => coerce_at(other, inner, path),
        },
        TypeDescriptor::Tuple(types) | TypeDescriptor::Sequence(types) => {
            let items = raw.as_array().ok_or_else(mismatch)?;
            if items.len() != types.len() {
                return Err(ConfigError::SchemaMismatch(format!(
                    "'{}' expected {} elements for {}, got {}",
                    path,
                    types.len(),
                    template,
                    items.len()
                )));
            }
            let converted = items
                .iter()
                .zip(types)
                .enumerate()
                .map(|(i, (item, ty))| coerce_at(item, ty, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match template {
                TypeDescriptor::Tuple(_) => ParamValue::Tuple(converted),
                _ => ParamValue::List(converted),
            })
        }
        TypeDescriptor::Map(schema) => {
            let object = raw.as_object().ok_or_else(mismatch)?;
            coerce_fields(object, schema, path).map(ParamValue::Map)
        }
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| {
            // Truncate toward zero, the way sampled floats are narrowed
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn coerce_str(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(_) => "object".to_string(),
        other => other.to_string(),
    }
}
