//! Configuration documents and their on-disk formats

use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Encoding of a document file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml` and `.yml` files are YAML, everything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// A configuration document: entry key to parameter-spec object, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    entries: Map<String, Value>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a decoded object, checking that every entry holds an object
    pub fn from_entries(entries: Map<String, Value>) -> Result<Self, ConfigError> {
        for (key, value) in &entries {
            if !value.is_object() {
                return Err(ConfigError::InvalidDocument(format!(
                    "entry '{}' must map parameter names to specs",
                    key
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Add an entry, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, params: Map<String, Value>) -> Option<Value> {
        self.entries.insert(key.into(), Value::Object(params))
    }

    pub fn get(&self, key: &str) -> Option<&Map<String, Value>> {
        self.entries.get(key).and_then(Value::as_object)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_entries(self) -> Map<String, Value> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_value(serde_yaml::from_str(yaml)?)
    }

    #[cfg(feature = "yaml")]
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&self.entries)?)
    }

    /// Parse text in the given format
    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self, ConfigError> {
        match format {
            DocumentFormat::Json => Self::from_json(text),
            #[cfg(feature = "yaml")]
            DocumentFormat::Yaml => Self::from_yaml(text),
            #[cfg(not(feature = "yaml"))]
            DocumentFormat::Yaml => Err(yaml_disabled()),
        }
    }

    /// Render the document in the given format
    pub fn render(&self, format: DocumentFormat) -> Result<String, ConfigError> {
        match format {
            DocumentFormat::Json => self.to_json(),
            #[cfg(feature = "yaml")]
            DocumentFormat::Yaml => self.to_yaml(),
            #[cfg(not(feature = "yaml"))]
            DocumentFormat::Yaml => Err(yaml_disabled()),
        }
    }

    /// Read a document, choosing the format from the file extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read configuration document from {}", path.display());
        Self::parse(&content, DocumentFormat::from_path(path))
    }

    /// Write the document, choosing the format from the file extension
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.render(DocumentFormat::from_path(path))?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Wrote configuration document to {}", path.display());
        Ok(())
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(entries) => Self::from_entries(entries),
            other => Err(ConfigError::InvalidDocument(format!(
                "expected an object at the top level, got {}",
                kind(&other)
            ))),
        }
    }
}

#[cfg(not(feature = "yaml"))]
fn yaml_disabled() -> ConfigError {
    ConfigError::InvalidDocument("YAML documents need the 'yaml' feature".to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
