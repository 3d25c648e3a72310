//! # xval-core: Foundational Types for Schema-Attached Rules
//!
//! This crate defines the data model shared by every other crate in the
//! workspace. It depends on nothing internal.
//!
//! ## Key Types
//!
//! 1. **`Schema`**: an OpenAPI-style schema node, deserialized from JSON or
//!    YAML. [`Schema::shape`] classifies a node into the closed [`Shape`]
//!    variant set that the declaration builder dispatches on.
//!
//! 2. **`ValidationRule`**: the `(rule, message)` pair schema authors attach
//!    to a node under a vendor extension such as `x-kubernetes-validations`.
//!    The pair is a compatibility contract with schema authors and
//!    round-trips unchanged through serde.
//!
//! 3. **`RuleConfig`**: the scope variable name and the extension keys that
//!    carry rules, loadable from a file or the environment.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `xval-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod ident;
pub mod rule;
pub mod schema;

pub use config::{RuleConfig, DEFAULT_RULE_EXTENSIONS, DEFAULT_SCOPE_VARIABLE};
pub use error::{ConfigError, SchemaError, ShapeError};
pub use ident::is_identifier;
pub use rule::ValidationRule;
pub use schema::{AdditionalProperties, Schema, SchemaTypes, Shape};
