//! Instance conversion into engine values.
//!
//! Conversion follows the declaration where the data agrees with it and
//! falls back to the data's own JSON type where it does not. A mismatch is
//! therefore never hidden: the engine sees the real value and reports a
//! runtime error when a rule uses it at the declared type.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use cel::Value as CelValue;
use serde_json::Value as Json;

use crate::decl::DeclType;

/// Convert `value` into an engine value, guided by `decl`.
pub fn to_cel_value(decl: &DeclType, value: &Json) -> CelValue {
    match (decl, value) {
        (_, Json::Null) => CelValue::Null,
        (DeclType::Double, Json::Number(n)) => CelValue::Float(n.as_f64().unwrap_or_default()),
        (DeclType::List(elem), Json::Array(items)) => CelValue::List(Arc::new(
            items.iter().map(|item| to_cel_value(elem, item)).collect(),
        )),
        (DeclType::Map(values), Json::Object(entries)) => {
            let map: HashMap<String, CelValue> = entries
                .iter()
                .map(|(k, v)| (k.clone(), to_cel_value(values, v)))
                .collect();
            CelValue::from(map)
        }
        (DeclType::Object(obj), Json::Object(entries)) => {
            let map: HashMap<String, CelValue> = entries
                .iter()
                .map(|(k, v)| {
                    let converted = match obj.fields.get(k) {
                        Some(field) => to_cel_value(field, v),
                        None => untyped(v),
                    };
                    (k.clone(), converted)
                })
                .collect();
            CelValue::from(map)
        }
        _ => untyped(value),
    }
}

/// Convert by JSON type alone.
fn untyped(value: &Json) -> CelValue {
    match value {
        Json::Null => CelValue::Null,
        Json::Bool(b) => CelValue::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                CelValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                CelValue::UInt(u)
            } else {
                CelValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => CelValue::String(Arc::new(s.clone())),
        Json::Array(items) => CelValue::List(Arc::new(items.iter().map(untyped).collect())),
        Json::Object(entries) => {
            let map: HashMap<String, CelValue> =
                entries.iter().map(|(k, v)| (k.clone(), untyped(v))).collect();
            CelValue::from(map)
        }
    }
}

/// A zero-valued instance of `decl`: every object field present, every
/// list holding one prototype element and every map holding one entry
/// under the empty key.
pub fn prototype(decl: &DeclType) -> Json {
    prototype_with_map_keys(decl, &BTreeSet::new())
}

/// Like [`prototype`], but every map also holds an entry under each of
/// `keys`.
pub fn prototype_with_map_keys(decl: &DeclType, keys: &BTreeSet<String>) -> Json {
    match decl {
        DeclType::Bool => Json::Bool(false),
        DeclType::Int => Json::from(0_i64),
        DeclType::Double => Json::from(0.0_f64),
        DeclType::String => Json::String(String::new()),
        DeclType::List(elem) => Json::Array(vec![prototype_with_map_keys(elem, keys)]),
        DeclType::Map(values) => {
            let element = prototype_with_map_keys(values, keys);
            std::iter::once(String::new())
                .chain(keys.iter().cloned())
                .map(|key| (key, element.clone()))
                .collect()
        }
        DeclType::Object(obj) => Json::Object(
            obj.fields
                .iter()
                .map(|(name, field)| (name.clone(), prototype_with_map_keys(field, keys)))
                .collect(),
        ),
    }
}

/// A short type name for diagnostics.
pub fn kind_name(value: &CelValue) -> &'static str {
    match value {
        CelValue::Bool(_) => "bool",
        CelValue::Int(_) => "int",
        CelValue::UInt(_) => "uint",
        CelValue::Float(_) => "double",
        CelValue::String(_) => "string",
        CelValue::Bytes(_) => "bytes",
        CelValue::List(_) => "list",
        CelValue::Map(_) => "map",
        CelValue::Null => "null",
        _ => "value",
    }
}
