//! Parameter values carried by step instances

use crate::error::{ConfigError, ParamError};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A single typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Fixed-arity ordered group
    Tuple(Vec<ParamValue>),
    /// Ordered sequence
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Build a tuple from anything convertible into parameter values
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        ParamValue::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a list from anything convertible into parameter values
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Convert a decoded JSON value without a type template
    ///
    /// Arrays become lists and integral numbers become `Int`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ParamValue::Str(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => ParamValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Encode as the JSON concrete-value form
    ///
    /// `name` is only used to label errors.
    pub fn to_json(&self, name: &str) -> Result<Value, ConfigError> {
        Ok(match self {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::Number((*i).into()),
            ParamValue::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                ConfigError::Serialization(name.to_string(), format!("{} is not representable in JSON", f))
            })?,
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Tuple(items) | ParamValue::List(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.to_json(&format!("{}[{}]", name, i)))
                    .collect::<Result<_, _>>()?,
            ),
            ParamValue::Map(map) => {
                let mut object = Map::new();
                for (key, item) in map {
                    object.insert(key.clone(), item.to_json(&format!("{}.{}", name, key))?);
                }
                Value::Object(object)
            }
        })
    }

    /// Short name of the value's kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "string",
            ParamValue::Tuple(_) => "tuple",
            ParamValue::List(_) => "list",
            ParamValue::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a tuple or list
    pub fn as_slice(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Tuple(items) | ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl<V: Into<ParamValue>> From<Option<V>> for ParamValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(value: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(value)
    }
}

/// The parameters of one step instance, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Get a parameter, failing if it is absent
    pub fn require(&self, name: &str) -> Result<&ParamValue, ParamError> {
        self.0
            .get(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))
    }

    pub fn require_i64(&self, name: &str) -> Result<i64, ParamError> {
        let value = self.require(name)?;
        value.as_i64().ok_or_else(|| wrong_type(name, "int", value))
    }

    pub fn require_f64(&self, name: &str) -> Result<f64, ParamError> {
        let value = self.require(name)?;
        value.as_f64().ok_or_else(|| wrong_type(name, "float", value))
    }

    pub fn require_bool(&self, name: &str) -> Result<bool, ParamError> {
        let value = self.require(name)?;
        value.as_bool().ok_or_else(|| wrong_type(name, "bool", value))
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ParamError> {
        let value = self.require(name)?;
        value.as_str().ok_or_else(|| wrong_type(name, "string", value))
    }

    pub fn require_slice(&self, name: &str) -> Result<&[ParamValue], ParamError> {
        let value = self.require(name)?;
        value.as_slice().ok_or_else(|| wrong_type(name, "sequence", value))
    }

    /// An optional integer: absent and `null` both map to `None`
    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>, ParamError> {
        match self.0.get(name) {
            None | Some(ParamValue::Null) => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| wrong_type(name, "int", value)),
        }
    }

    /// Encode every parameter to its JSON concrete-value form
    pub fn to_json(&self) -> Result<Map<String, Value>, ConfigError> {
        let mut object = Map::new();
        for (name, value) in &self.0 {
            object.insert(name.clone(), value.to_json(name)?);
        }
        Ok(object)
    }
}

fn wrong_type(name: &str, expected: &'static str, found: &ParamValue) -> ParamError {
    ParamError::WrongType {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}

impl FromIterator<(String, ParamValue)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Parameters {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
