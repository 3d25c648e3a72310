//! # Rule Evaluator
//!
//! Runs compiled rules against instance data. Each rule yields at most one
//! [`ValidationError`]; rules are independent, so a failing or erroring
//! rule never prevents the rest from running.

use std::fmt;

use serde_json::Value as Json;
use tracing::trace;

use crate::compile::CompiledRule;
use crate::value::kind_name;

/// A rule that did not hold for an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The rule evaluated to `false`, or to something other than `true`.
    RuleFailed {
        /// Path of the validated value within the instance.
        path: String,
        /// The expression text.
        rule: String,
        /// The rule's failure message.
        message: String,
    },

    /// The rule could not be evaluated against this instance.
    RuleError {
        /// Path of the validated value within the instance.
        path: String,
        /// The expression text.
        rule: String,
        /// The engine's runtime diagnostic.
        cause: String,
    },
}

impl ValidationError {
    pub fn path(&self) -> &str {
        match self {
            ValidationError::RuleFailed { path, .. } | ValidationError::RuleError { path, .. } => {
                path
            }
        }
    }

    pub fn rule(&self) -> &str {
        match self {
            ValidationError::RuleFailed { rule, .. } | ValidationError::RuleError { rule, .. } => {
                rule
            }
        }
    }

    pub fn is_runtime_error(&self) -> bool {
        matches!(self, ValidationError::RuleError { .. })
    }
}

fn location(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::RuleFailed { path, message, .. } => {
                write!(f, "{}: {message}", location(path))
            }
            ValidationError::RuleError { path, rule, cause } => {
                write!(f, "{}: error evaluating rule '{rule}': {cause}", location(path))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl CompiledRule {
    /// Evaluate this rule against `instance`, the value found at `path`.
    pub fn evaluate(&self, path: &str, instance: &Json) -> Option<ValidationError> {
        match self.env.execute(&self.program, instance) {
            Ok(cel::Value::Bool(true)) => None,
            Ok(value) => {
                if !matches!(value, cel::Value::Bool(_)) {
                    trace!(path, rule = %self.rule.rule, kind = kind_name(&value), "rule returned a non-boolean");
                }
                Some(ValidationError::RuleFailed {
                    path: path.to_string(),
                    rule: self.rule.rule.clone(),
                    message: self.rule.failure_message(),
                })
            }
            Err(e) => {
                trace!(path, rule = %self.rule.rule, error = %e, "rule evaluation failed");
                Some(ValidationError::RuleError {
                    path: path.to_string(),
                    rule: self.rule.rule.clone(),
                    cause: e.to_string(),
                })
            }
        }
    }
}

/// Evaluate every compiled slot against `instance` and collect the errors
/// in rule order. Empty slots are skipped.
pub fn evaluate_all(
    programs: &[Option<CompiledRule>],
    path: &str,
    instance: &Json,
) -> Vec<ValidationError> {
    programs
        .iter()
        .flatten()
        .filter_map(|program| program.evaluate(path, instance))
        .collect()
}
