//! # Structural Validation
//!
//! Checks an instance against the structural keywords of a schema: types,
//! `required`, `properties`, `items` and `additionalProperties`.
//!
//! ## OpenAPI Translation
//!
//! Schemas are written in the OpenAPI dialect, which differs from JSON
//! Schema in two ways that matter here:
//!
//! - `nullable: true` widens the node's `type` with `"null"`.
//! - `format` values such as `int64` and `byte` are annotations only; they
//!   are dropped so that unknown formats never fail compilation.
//!
//! Vendor extensions (`x-…`) are ignored by the `jsonschema` crate and left
//! in place.

use std::fmt;

use jsonschema::Validator;
use serde_json::{Map, Value};

/// A single structural violation.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the translated schema.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of structural violations.
#[derive(Debug, Clone, Default)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {v}")?;
        }
        Ok(())
    }
}

/// A compiled structural validator for one schema document.
///
/// `Send + Sync`: compile once, validate from any thread.
pub struct StructuralValidator {
    validator: Validator,
}

impl fmt::Debug for StructuralValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralValidator").finish_non_exhaustive()
    }
}

impl StructuralValidator {
    /// Translate `schema` (OpenAPI dialect) to JSON Schema and compile it.
    ///
    /// # Errors
    ///
    /// Returns the compiler's diagnostic if the translated schema is not a
    /// valid JSON Schema.
    pub fn new(schema: &Value) -> Result<Self, String> {
        let translated = to_json_schema(schema);
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let validator = opts.build(&translated).map_err(|e| e.to_string())?;
        Ok(Self { validator })
    }

    /// Validate `instance`, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Violations {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        tracing::debug!(count = violations.len(), "structural validation finished");
        Violations { violations }
    }
}

/// Translate an OpenAPI schema node into JSON Schema.
pub fn to_json_schema(schema: &Value) -> Value {
    let Value::Object(node) = schema else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in node {
        match key.as_str() {
            "nullable" | "format" => {}
            "properties" => {
                let props = match value {
                    Value::Object(props) => Value::Object(
                        props
                            .iter()
                            .map(|(name, child)| (name.clone(), to_json_schema(child)))
                            .collect(),
                    ),
                    other => other.clone(),
                };
                out.insert(key.clone(), props);
            }
            "items" | "additionalProperties" => {
                out.insert(key.clone(), to_json_schema(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    if node.get("nullable") == Some(&Value::Bool(true)) {
        let widened = match out.remove("type") {
            Some(Value::String(t)) => Some(Value::Array(vec![
                Value::String(t),
                Value::String("null".to_string()),
            ])),
            Some(Value::Array(mut ts)) => {
                if !ts.iter().any(|t| t == "null") {
                    ts.push(Value::String("null".to_string()));
                }
                Some(Value::Array(ts))
            }
            other => other,
        };
        if let Some(t) = widened {
            out.insert("type".to_string(), t);
        }
    }

    Value::Object(out)
}
