//! # Declaration Builder
//!
//! Derives the engine-facing type of a schema node. The walk is a single
//! recursive match over [`Shape`], so every node kind is handled exactly
//! once and an unmappable node is reported, never guessed at.
//!
//! Scalar mapping:
//!
//! | schema    | declaration |
//! |-----------|-------------|
//! | `string`  | `String` (also for `format: byte`) |
//! | `integer` | `Int` (64-bit signed) |
//! | `number`  | `Double` |
//! | `boolean` | `Bool` |
//!
//! Object types are named by their path from the root, e.g.
//! `self.spec.template`, so nested objects stay distinguishable in
//! diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use xval_core::{Schema, Shape, ShapeError};

/// A schema node that cannot be mapped to a declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot declare a type for '{path}': {source}")]
pub struct DeclError {
    /// Dotted path of the offending node, starting at the root name.
    pub path: String,
    #[source]
    pub source: ShapeError,
}

/// An object type with named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDecl {
    /// Type name, the node's path from the root.
    pub name: String,
    pub fields: BTreeMap<String, DeclType>,
}

/// The engine-facing type of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclType {
    Bool,
    Int,
    Double,
    String,
    List(Box<DeclType>),
    Map(Box<DeclType>),
    Object(ObjectDecl),
}

impl DeclType {
    /// Returns true for `Bool`, `Int`, `Double` and `String`.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            DeclType::Bool | DeclType::Int | DeclType::Double | DeclType::String
        )
    }

    /// Returns true if a map type appears anywhere in this declaration.
    pub fn contains_map(&self) -> bool {
        match self {
            DeclType::Map(_) => true,
            DeclType::List(elem) => elem.contains_map(),
            DeclType::Object(obj) => obj.fields.values().any(DeclType::contains_map),
            _ => false,
        }
    }

    /// The fields of an object declaration.
    pub fn fields(&self) -> Option<&BTreeMap<String, DeclType>> {
        match self {
            DeclType::Object(obj) => Some(&obj.fields),
            _ => None,
        }
    }
}

impl fmt::Display for DeclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclType::Bool => write!(f, "bool"),
            DeclType::Int => write!(f, "int"),
            DeclType::Double => write!(f, "double"),
            DeclType::String => write!(f, "string"),
            DeclType::List(elem) => write!(f, "list({elem})"),
            DeclType::Map(value) => write!(f, "map(string, {value})"),
            DeclType::Object(obj) => write!(f, "object({})", obj.name),
        }
    }
}

/// Build the declaration for `schema`, naming the root `name`.
///
/// # Errors
///
/// Returns [`DeclError`] for the first node, in depth-first order, whose
/// shape cannot be classified.
pub fn build_declaration(schema: &Schema, name: &str) -> Result<DeclType, DeclError> {
    let shape = schema.shape().map_err(|source| DeclError {
        path: name.to_string(),
        source,
    })?;

    Ok(match shape {
        Shape::Object(properties) => {
            let mut fields = BTreeMap::new();
            for (field, child) in properties {
                let decl = build_declaration(child, &format!("{name}.{field}"))?;
                fields.insert(field.clone(), decl);
            }
            DeclType::Object(ObjectDecl {
                name: name.to_string(),
                fields,
            })
        }
        Shape::Map(values) => {
            DeclType::Map(Box::new(build_declaration(values, &format!("{name}.@value"))?))
        }
        Shape::Array(items) => {
            DeclType::List(Box::new(build_declaration(items, &format!("{name}.@items"))?))
        }
        Shape::String { .. } => DeclType::String,
        Shape::Integer => DeclType::Int,
        Shape::Number => DeclType::Double,
        Shape::Boolean => DeclType::Bool,
    })
}
