//! # Error Types
//!
//! Errors raised while reading schema documents and rule configuration.
//! All errors use `thiserror` for derive-based `Display` and `Error`.
//!
//! Evaluation-time errors live in `xval-cel`; the errors here describe
//! problems with the inputs themselves, before any rule is compiled.

use thiserror::Error;

/// A schema node whose shape cannot be classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The node has no `type` and nothing that implies one.
    #[error("schema node has no type")]
    MissingType,

    /// The node's `type` is outside the supported set.
    #[error("unsupported schema type '{0}'")]
    UnsupportedType(String),

    /// An array node without an `items` schema.
    #[error("array schema has no items")]
    MissingItems,
}

/// Error reading rule definitions or other extension data from a schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// An extension key holds something other than a list of rules.
    #[error("invalid rule list under '{key}': {reason}")]
    InvalidRules {
        /// The extension key that was read.
        key: String,
        /// Why the value could not be read as rules.
        reason: String,
    },

    /// The schema document could not be parsed.
    #[error("invalid schema document: {0}")]
    InvalidDocument(String),
}

/// Rule configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The scope variable is empty or not a usable identifier.
    #[error("invalid scope variable '{0}': must be a non-reserved identifier")]
    InvalidScopeVariable(String),

    /// No extension keys were configured.
    #[error("at least one rule extension key is required")]
    NoRuleExtensions,

    /// The configuration file could not be read.
    #[error("cannot read config file '{path}': {reason}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// Underlying IO failure.
        reason: String,
    },

    /// The configuration file is not valid YAML or JSON.
    #[error("invalid config file '{path}': {reason}")]
    Parse {
        /// Path of the configuration file.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },
}
