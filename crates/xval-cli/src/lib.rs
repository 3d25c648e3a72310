//! # xval-cli: Command-Line Interface for Schema Rules
//!
//! Provides the `xval` binary.
//!
//! ## Subcommands
//!
//! - `xval check SCHEMA`: compile every rule in a schema and report
//!   compile errors with their schema paths.
//! - `xval validate SCHEMA DOCUMENT...`: validate documents against the
//!   schema's structure, then against its rules.
//!
//! ```bash
//! xval check crd.yaml
//! xval -v validate crd.yaml deploy-a.yaml deploy-b.json
//! ```
//!
//! Exit codes: 0 on success, 1 on compile or validation failures, 2 on
//! operational errors such as an unreadable schema.

pub mod check;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use xval_core::RuleConfig;

/// Load rule configuration from `path` if given, otherwise from the
/// environment.
pub fn load_config(path: Option<&Path>) -> Result<RuleConfig> {
    match path {
        Some(path) => RuleConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => RuleConfig::from_env().context("invalid rule configuration in environment"),
    }
}
