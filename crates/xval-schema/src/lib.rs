//! # xval-schema: Documents and Structural Validation
//!
//! Loads schema and instance documents from JSON or YAML and checks
//! instances against the structural part of a schema (types, required
//! properties, item shapes) before any rule runs.
//!
//! ## Loading (`load`)
//!
//! - [`load_document`]: read a `.json`, `.yaml` or `.yml` file into a
//!   `serde_json::Value`.
//! - [`load_schema`]: read a file into an [`xval_core::Schema`].
//!
//! ## Structural Validation (`structural`)
//!
//! [`StructuralValidator`] translates an OpenAPI-style node into JSON Schema
//! (Draft 2020-12), compiles it once with the `jsonschema` crate, and
//! reports violations with instance paths.
//!
//! ## Crate Policy
//!
//! - Depends only on `xval-core` internally.
//! - Rules attached to the schema are ignored here; see `xval-cel`.

pub mod load;
pub mod structural;

pub use load::{load_document, load_schema, parse_document, yaml_to_json, DocumentError, ParseError};
pub use structural::{StructuralValidator, Violation, Violations};
