//! # Document Loading
//!
//! Schemas and instances arrive as JSON or YAML files. Both are normalized
//! to `serde_json::Value` so that every later stage works on one value
//! model.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use xval_core::Schema;

/// Error loading a schema or instance document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("cannot read '{path}': {reason}")]
    Read {
        /// Path to the document.
        path: String,
        /// Underlying IO failure.
        reason: String,
    },

    /// The content is not valid JSON or YAML.
    #[error("cannot parse '{path}': {source}")]
    Parse {
        /// Path to the document.
        path: String,
        #[source]
        source: ParseError,
    },

    /// The document parsed but is not a schema.
    #[error("'{path}' is not a valid schema: {reason}")]
    InvalidSchema {
        /// Path to the document.
        path: String,
        /// Why the value is not a schema.
        reason: String,
    },
}

/// Why document text did not yield a JSON value.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The YAML parsed but uses a value JSON cannot hold.
    #[error("YAML value at {at} has no JSON form: {reason}")]
    NotJson {
        /// Location of the value, `$` for the document root.
        at: String,
        reason: String,
    },
}

/// Parse document text. `extension` selects the format: `json` parses as
/// JSON, anything else as YAML (which also accepts JSON).
pub fn parse_document(content: &str, extension: &str) -> Result<Value, ParseError> {
    if extension == "json" {
        return Ok(serde_json::from_str(content)?);
    }
    yaml_to_json(serde_yaml::from_str(content)?)
}

/// Read and parse a JSON or YAML document.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    tracing::debug!(path = %path.display(), format = ext, "loading document");
    parse_document(&content, ext).map_err(|source| DocumentError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Read a schema document. Returns the parsed [`Schema`] together with the
/// raw value, which structural validation consumes.
pub fn load_schema(path: &Path) -> Result<(Schema, Value), DocumentError> {
    let raw = load_document(path)?;
    let schema = Schema::from_value(raw.clone()).map_err(|e| DocumentError::InvalidSchema {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok((schema, raw))
}

/// Convert a parsed YAML document into the JSON value model.
///
/// Tags are dropped and scalar mapping keys become strings. Non-finite
/// floats and composite keys have no JSON form and are rejected.
pub fn yaml_to_json(yaml: serde_yaml::Value) -> Result<Value, ParseError> {
    convert(yaml, "$")
}

fn convert(yaml: serde_yaml::Value, at: &str) -> Result<Value, ParseError> {
    use serde_yaml::Value as Yaml;

    let not_json = |reason: String| ParseError::NotJson {
        at: at.to_string(),
        reason,
    };
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::String(s) => Value::String(s),
        Yaml::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (None, Some(u), _) => Value::from(u),
            (None, None, Some(f)) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| not_json(format!("non-finite number {f}")))?,
            (None, None, None) => return Err(not_json(format!("unrepresentable number {n}"))),
        },
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| convert(item, &format!("{at}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut object = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(not_json(format!("mapping key {other:?} is not a scalar"))),
                };
                let value = convert(value, &format!("{at}.{key}"))?;
                object.insert(key, value);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => convert(tagged.value, at)?,
    })
}
