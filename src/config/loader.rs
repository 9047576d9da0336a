//! Document parsing: YAML, JSON or TOML into an order-preserving JSON tree.
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::ConfigError;

/// Supported document formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl Format {
    /// Pick the format from `path`'s extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read and parse the document at `path`.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, unparsable, or its
/// top level is not a mapping.
pub fn load_document(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.display().to_string()));
    }
    let format = Format::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_document(&content, format, &path.display().to_string())
}

/// Parse `content` as `format`. `label` names the document in errors.
///
/// # Errors
///
/// Returns an error if the content is unparsable or its top level is not a
/// mapping.
pub fn parse_document(
    content: &str,
    format: Format,
    label: &str,
) -> Result<Map<String, Value>, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: label.to_string(),
        message,
    };
    let value = match format {
        Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(yaml_to_json)
            .map_err(|e| parse_err(e.to_string()))?,
        Format::Json => {
            serde_json::from_str::<Value>(content).map_err(|e| parse_err(e.to_string()))?
        }
        Format::Toml => {
            toml::from_str::<Value>(content).map_err(|e| parse_err(e.to_string()))?
        }
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::NotAMapping {
            path: label.to_string(),
            found: kind_name(&other).to_string(),
        }),
    }
}

/// Convert a YAML tree to JSON, stringifying non-string mapping keys.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Y;
    match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Y::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Y::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => String::new(),
        other => match yaml_to_json(other) {
            Value::String(s) => s,
            v => v.to_string(),
        },
    }
}

/// Human-readable name of a JSON value's kind, for diagnostics.
pub(crate) const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
