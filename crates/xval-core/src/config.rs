//! Rule configuration.
//!
//! Controls the name rules use for the value in scope and which vendor
//! extension keys carry rule lists. Defaults match Kubernetes
//! CustomResourceDefinition conventions. Override via a YAML/JSON file or
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ident::is_identifier;

/// Default name of the variable bound to the value in scope.
pub const DEFAULT_SCOPE_VARIABLE: &str = "self";

/// Default extension keys that carry rule lists, in lookup order.
pub const DEFAULT_RULE_EXTENSIONS: &[&str] = &["x-kubernetes-validations", "x-kubernetes-validator"];

/// Configuration for rule compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct RuleConfig {
    /// Variable name bound to the whole value at each schema node.
    pub scope_variable: String,
    /// Extension keys read for rules, in order.
    pub rule_extensions: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            scope_variable: DEFAULT_SCOPE_VARIABLE.to_string(),
            rule_extensions: DEFAULT_RULE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RuleConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `XVAL_SCOPE_VARIABLE` (default: `self`)
    /// - `XVAL_RULE_EXTENSIONS`, comma-separated
    ///   (default: `x-kubernetes-validations,x-kubernetes-validator`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(scope) = lookup("XVAL_SCOPE_VARIABLE") {
            config.scope_variable = scope.trim().to_string();
        }
        if let Some(raw) = lookup("XVAL_RULE_EXTENSIONS") {
            config.rule_extensions = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML or JSON file. Missing keys take
    /// their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the scope variable is a declarable identifier and that at
    /// least one extension key is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.scope_variable) {
            return Err(ConfigError::InvalidScopeVariable(self.scope_variable.clone()));
        }
        if self.rule_extensions.is_empty() {
            return Err(ConfigError::NoRuleExtensions);
        }
        Ok(())
    }
}
