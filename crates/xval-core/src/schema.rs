//! # Schema Node Model
//!
//! An OpenAPI v3 style schema node. Only the structural keywords the rule
//! pipeline needs are modeled as fields; everything else (including all
//! `x-…` vendor extensions) is kept verbatim in [`Schema::extensions`] so a
//! document survives a deserialize/serialize cycle.
//!
//! ## Shape Classification
//!
//! [`Schema::shape`] reduces a node to one of seven kinds. The mapping
//! mirrors how structural schemas are read by API servers:
//!
//! | `type`    | extra keywords                         | shape     |
//! |-----------|----------------------------------------|-----------|
//! | `object`  | `additionalProperties: <schema>`       | `Map`     |
//! | `object`  | otherwise                              | `Object`  |
//! | `array`   | `items` required                       | `Array`   |
//! | `string`  | `format: byte` sets the byte hint      | `String`  |
//! | `integer` |                                        | `Integer` |
//! | `number`  |                                        | `Number`  |
//! | `boolean` |                                        | `Boolean` |
//!
//! A node without `type` that declares `properties` or an
//! `additionalProperties` schema is read as an object.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{SchemaError, ShapeError};
use crate::rule::ValidationRule;

/// The `type` keyword: a single name or a list of names.
///
/// Serializes back as a plain string when it holds exactly one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaTypes(Vec<String>);

impl SchemaTypes {
    pub fn new(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(types.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The authoritative type name: the first listed.
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|t| t == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Serialize for SchemaTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SchemaTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(t) => Self(vec![t]),
            OneOrMany::Many(ts) => Self(ts),
        })
    }
}

/// The `additionalProperties` keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` or `false`.
    Allowed(bool),
    /// A schema every additional value must satisfy.
    Schema(Box<Schema>),
}

/// A schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// `type`.
    #[serde(rename = "type", default, skip_serializing_if = "SchemaTypes::is_empty")]
    pub types: SchemaTypes,

    /// `format`, e.g. `byte`, `int64`, `double`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Named child schemas of an object.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,

    /// Element schema of an array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Catch-all schema for keys not listed in `properties`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    /// Property names that must be present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Whether `null` is accepted in place of a value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,

    /// Every other keyword, including vendor extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// The closed set of node kinds the rule pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    /// An object with named properties.
    Object(&'a BTreeMap<String, Schema>),
    /// An object whose keys are free-form, all values sharing one schema.
    Map(&'a Schema),
    /// A list of elements sharing one schema.
    Array(&'a Schema),
    /// A string; `byte` is set for `format: byte` (base64 content).
    String { byte: bool },
    Integer,
    Number,
    Boolean,
}

impl Shape<'_> {
    /// Returns true for the four scalar kinds.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Shape::String { .. } | Shape::Integer | Shape::Number | Shape::Boolean
        )
    }
}

impl Schema {
    /// Parse a schema from JSON or YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(text).map_err(|e| SchemaError::InvalidDocument(e.to_string()))
    }

    /// Build a schema from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidDocument(e.to_string()))
    }

    /// Classify this node.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] when the node has no usable type, an
    /// unsupported type, or is an array without `items`.
    pub fn shape(&self) -> Result<Shape<'_>, ShapeError> {
        let ty = match self.types.primary() {
            Some(ty) => ty,
            None if !self.properties.is_empty() || self.map_values().is_some() => "object",
            None => return Err(ShapeError::MissingType),
        };

        match ty {
            "object" => Ok(match self.map_values() {
                Some(values) => Shape::Map(values),
                None => Shape::Object(&self.properties),
            }),
            "array" => self
                .items
                .as_deref()
                .map(Shape::Array)
                .ok_or(ShapeError::MissingItems),
            "string" => Ok(Shape::String {
                byte: self.format.as_deref() == Some("byte"),
            }),
            "integer" => Ok(Shape::Integer),
            "number" => Ok(Shape::Number),
            "boolean" => Ok(Shape::Boolean),
            other => Err(ShapeError::UnsupportedType(other.to_string())),
        }
    }

    /// The `additionalProperties` schema, if one is given.
    pub fn map_values(&self) -> Option<&Schema> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(schema.as_ref()),
            _ => None,
        }
    }

    /// Returns true if `field` is listed under `required`.
    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }

    /// Read the rules attached under any of `keys`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidRules`] if a key holds something other
    /// than a list of `{rule, message}` objects.
    pub fn rules<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<ValidationRule>, SchemaError> {
        let mut rules = Vec::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(value) = self.extensions.get(key) {
                let parsed: Vec<ValidationRule> = serde_json::from_value(value.clone())
                    .map_err(|e| SchemaError::InvalidRules {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                rules.extend(parsed);
            }
        }
        Ok(rules)
    }

    /// Returns true if any of `keys` is present on this node.
    pub fn has_rules<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|k| self.extensions.contains_key(k.as_ref()))
    }

    /// Attach rules under `key`, replacing what was there.
    pub fn set_rules(&mut self, key: &str, rules: &[ValidationRule]) {
        let value = Value::Array(
            rules
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "rule": r.rule,
                        "message": r.message,
                    })
                })
                .collect(),
        );
        self.extensions.insert(key.to_string(), value);
    }
}
