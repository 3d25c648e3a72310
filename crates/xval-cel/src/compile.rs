//! # Rule Compiler
//!
//! Builds one [`Environment`] for a schema node and compiles every rule
//! attached to it. Compilation never stops early: each rule is compiled
//! independently, failures are collected, and the output keeps one slot per
//! input rule so indices line up with the rule list.
//!
//! ## Checking
//!
//! The engine parses expressions but does not type-check them against
//! declarations. After parsing, each rule is therefore run once against a
//! zero-valued prototype instance of the node's declaration (see
//! [`crate::value::prototype`]). Errors that can only come from the shape
//! of the expression, such as an undeclared variable, an operator applied
//! to the wrong types, or `size()` of an integer, reject the rule. Errors
//! that depend on the data, such as division by zero or a failed
//! conversion, do not. A rule whose prototype result is not a boolean is
//! rejected.
//!
//! Prototype maps cannot hold every key a rule might look up. When a member
//! lookup misses, the prototype is rebuilt with the missing key added to
//! every map and the rule is run again. A lookup that still misses was made
//! on an object without that field and rejects the rule.
//!
//! `has()` on an object field never fails, so a presence test of an
//! undeclared field compiles and is always false.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use cel::{ExecutionError, Program, Value as CelValue};
use thiserror::Error;
use tracing::debug;
use xval_core::{RuleConfig, Schema, SchemaError, ValidationRule};

use crate::decl::{build_declaration, DeclError, DeclType};
use crate::env::{EnvError, Environment, ENGINE_FAULT};
use crate::ext;
use crate::value::{kind_name, prototype, prototype_with_map_keys};

/// Functions whose failures depend on the data they receive.
const DATA_DEPENDENT_FUNCTIONS: &[&str] = &[
    "int",
    "uint",
    "double",
    "timestamp",
    "duration",
    ENGINE_FAULT,
];

/// Upper bound on prototype reruns for one rule.
const MAX_MAP_KEY_RETRIES: usize = 16;

/// A failure to compile one rule, or all rules of a node.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    /// The node's schema cannot be declared.
    #[error(transparent)]
    Declaration(#[from] DeclError),

    /// The node's environment cannot be built.
    #[error(transparent)]
    Environment(#[from] EnvError),

    /// The node's rule list cannot be read.
    #[error("{0}")]
    Rules(String),

    /// The rule's expression text is empty.
    #[error("rule {index}: rule is not specified")]
    RuleNotSpecified {
        /// Position of the rule in the node's rule list.
        index: usize,
        /// The rule's failure message, for identification.
        message: String,
    },

    /// The expression failed to parse or check.
    #[error("compilation failed for rule: {message} with message: {diagnostic}")]
    Compilation {
        /// Position of the rule in the node's rule list.
        index: usize,
        /// The expression text.
        rule: String,
        /// The rule's failure message, for identification.
        message: String,
        /// The engine's or checker's diagnostic.
        diagnostic: String,
    },
}

impl From<SchemaError> for CompileError {
    fn from(err: SchemaError) -> Self {
        CompileError::Rules(err.to_string())
    }
}

/// One successfully compiled rule, ready to evaluate.
///
/// Cheap to clone; clones share the program and environment.
#[derive(Clone)]
pub struct CompiledRule {
    pub(crate) rule: ValidationRule,
    pub(crate) program: Arc<Program>,
    pub(crate) env: Arc<Environment>,
}

impl CompiledRule {
    /// The definition this rule was compiled from.
    pub fn rule(&self) -> &ValidationRule {
        &self.rule
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("rule", &self.rule.rule)
            .field("message", &self.rule.message)
            .finish_non_exhaustive()
    }
}

/// The outcome of compiling one node's rules.
#[derive(Debug, Clone, Default)]
pub struct RuleCompilation {
    /// One slot per input rule; `None` where compilation failed.
    pub programs: Vec<Option<CompiledRule>>,
    /// Every error encountered, in rule order.
    pub errors: Vec<CompileError>,
}

impl RuleCompilation {
    fn failed(slots: usize, error: CompileError) -> Self {
        Self {
            programs: vec![None; slots],
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of rules that compiled.
    pub fn compiled(&self) -> usize {
        self.programs.iter().filter(|p| p.is_some()).count()
    }
}

/// Compile `rules` against a node declared as `decl`.
///
/// `scope_variable` names the whole value at the node and defaults to
/// `self`.
pub fn compile_rules(
    decl: &DeclType,
    rules: &[ValidationRule],
    scope_variable: Option<&str>,
) -> RuleCompilation {
    let scope = scope_variable.unwrap_or(xval_core::DEFAULT_SCOPE_VARIABLE);
    let env = match Environment::new(decl.clone(), scope) {
        Ok(env) => Arc::new(env),
        Err(e) => return RuleCompilation::failed(rules.len(), e.into()),
    };
    let sample = prototype(env.root());

    let mut out = RuleCompilation {
        programs: Vec::with_capacity(rules.len()),
        errors: Vec::new(),
    };
    for (index, rule) in rules.iter().enumerate() {
        match compile_one(index, rule, &env, &sample) {
            Ok(program) => {
                debug!(index, rule = %rule.rule, "compiled rule");
                out.programs.push(Some(CompiledRule {
                    rule: rule.clone(),
                    program: Arc::new(program),
                    env: Arc::clone(&env),
                }));
            }
            Err(e) => {
                debug!(index, error = %e, "rule failed to compile");
                out.programs.push(None);
                out.errors.push(e);
            }
        }
    }
    out
}

/// Compile the rules attached to `schema` itself (not its children).
///
/// Rules are read from the extension keys in `config`; the root of the
/// declaration is named after the scope variable.
pub fn compile_schema(schema: &Schema, config: &RuleConfig) -> RuleCompilation {
    let rules = match schema.rules(config.rule_extensions.as_slice()) {
        Ok(rules) => rules,
        Err(e) => return RuleCompilation::failed(0, e.into()),
    };
    match build_declaration(schema, &config.scope_variable) {
        Ok(decl) => compile_rules(&decl, &rules, Some(&config.scope_variable)),
        Err(e) => RuleCompilation::failed(rules.len(), e.into()),
    }
}

fn compile_one(
    index: usize,
    rule: &ValidationRule,
    env: &Environment,
    sample: &serde_json::Value,
) -> Result<Program, CompileError> {
    if !rule.is_specified() {
        return Err(CompileError::RuleNotSpecified {
            index,
            message: rule.message.clone(),
        });
    }
    let compilation_error = |diagnostic: String| CompileError::Compilation {
        index,
        rule: rule.rule.clone(),
        message: rule.message.clone(),
        diagnostic,
    };

    let program = Program::compile(&rule.rule).map_err(|e| compilation_error(e.to_string()))?;
    let mut outcome = env.execute(&program, sample);
    let mut map_keys = BTreeSet::new();
    while env.root().contains_map() {
        let key = match &outcome {
            Err(ExecutionError::NoSuchKey(key)) => key.to_string(),
            _ => break,
        };
        if !map_keys.insert(key) {
            break;
        }
        if map_keys.len() > MAX_MAP_KEY_RETRIES {
            debug!(index, "too many map keys looked up, treating miss as data-dependent");
            return Ok(program);
        }
        outcome = env.execute(&program, &prototype_with_map_keys(env.root(), &map_keys));
    }

    match outcome {
        Ok(CelValue::Bool(_)) => Ok(program),
        Ok(other) => Err(compilation_error(format!(
            "rule must evaluate to bool, got {}",
            kind_name(&other)
        ))),
        Err(e) if is_structural(&e) => Err(compilation_error(e.to_string())),
        Err(_) => Ok(program),
    }
}

/// Whether a prototype evaluation failure reflects the expression rather
/// than the data.
fn is_structural(err: &ExecutionError) -> bool {
    match err {
        ExecutionError::UndeclaredReference { .. }
        | ExecutionError::UnsupportedBinaryOperator { .. }
        | ExecutionError::UnsupportedUnaryOperator { .. }
        | ExecutionError::UnsupportedTargetType { .. }
        | ExecutionError::NotSupportedAsMethod { .. }
        | ExecutionError::InvalidArgumentCount { .. }
        | ExecutionError::UnexpectedType { .. }
        | ExecutionError::ValuesNotComparable { .. }
        | ExecutionError::UnsupportedMapIndex { .. }
        | ExecutionError::UnsupportedListIndex { .. }
        | ExecutionError::UnsupportedIndex { .. }
        | ExecutionError::NoSuchKey { .. } => true,
        ExecutionError::FunctionError { function, .. } => {
            !DATA_DEPENDENT_FUNCTIONS.contains(&function.as_str())
                && !ext::FUNCTION_NAMES.contains(&function.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> Schema {
        Schema::from_value(value).unwrap()
    }

    fn rule(text: &str) -> ValidationRule {
        ValidationRule::new(text, format!("{text} failed"))
    }

    fn compile(value: serde_json::Value, rules: &[&str]) -> RuleCompilation {
        let decl = build_declaration(&schema(value), "self").unwrap();
        let rules: Vec<ValidationRule> = rules.iter().map(|r| rule(r)).collect();
        compile_rules(&decl, &rules, None)
    }

    #[test]
    fn test_valid_scalar_rules_compile() {
        assert!(compile(json!({"type": "integer"}), &["self > 0"]).is_ok());
        assert!(compile(json!({"type": "number"}), &["self > 1.0"]).is_ok());
        assert!(compile(json!({"type": "boolean"}), &["self == true"]).is_ok());
        assert!(compile(json!({"type": "string"}), &["self.startsWith('s')"]).is_ok());
        assert!(
            compile(json!({"type": "string", "format": "byte"}), &["string(self).endsWith('s')"])
                .is_ok()
        );
    }

    #[test]
    fn test_size_of_integer_is_rejected() {
        let out = compile(json!({"type": "integer"}), &["size(self) == 10"]);
        assert_eq!(out.errors.len(), 1);
        assert!(out.programs[0].is_none());
        let text = out.errors[0].to_string();
        assert!(text.starts_with("compilation failed for rule: size(self) == 10 failed"), "{text}");
    }

    #[test]
    fn test_size_of_number_is_rejected() {
        let out = compile(json!({"type": "number"}), &["size(self) == 10"]);
        assert!(matches!(out.errors[0], CompileError::Compilation { .. }));
    }

    #[test]
    fn test_empty_rule_is_not_specified() {
        let out = compile(json!({"type": "integer"}), &["", "self > 0", "   "]);
        assert_eq!(out.programs.len(), 3);
        assert!(out.programs[1].is_some());
        assert_eq!(out.errors.len(), 2);
        assert_eq!(out.errors[0].to_string(), "rule 0: rule is not specified");
        assert!(matches!(out.errors[1], CompileError::RuleNotSpecified { index: 2, .. }));
    }

    #[test]
    fn test_parse_error_does_not_block_siblings() {
        let out = compile(json!({"type": "integer"}), &["self >", "self < 10"]);
        assert!(out.programs[0].is_none());
        assert!(out.programs[1].is_some());
        assert_eq!(out.compiled(), 1);
    }

    #[test]
    fn test_undeclared_variable_is_rejected() {
        let out = compile(
            json!({"type": "object", "properties": {"a": {"type": "integer"}}}),
            &["b > 0"],
        );
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn test_unknown_field_is_rejected_on_plain_objects() {
        let out = compile(
            json!({"type": "object", "properties": {"a": {"type": "integer"}}}),
            &["self.b > 0"],
        );
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn test_map_lookups_are_data_dependent() {
        let out = compile(
            json!({"type": "object", "additionalProperties": {"type": "string"}}),
            &["self.app == 'web'", "size(self) > 0"],
        );
        assert!(out.is_ok(), "{:?}", out.errors);
    }

    #[test]
    fn test_unknown_field_is_rejected_beside_a_map() {
        let out = compile(
            json!({
                "type": "object",
                "properties": {
                    "count": {"type": "integer"},
                    "labels": {"type": "object", "additionalProperties": {"type": "string"}}
                }
            }),
            &["self.typo > 0", "self.labels.app == 'web'", "count > 0"],
        );
        assert_eq!(out.errors.len(), 1, "{:?}", out.errors);
        assert!(out.programs[0].is_none());
        assert!(out.errors[0].to_string().contains("No such key: typo"));
        assert_eq!(out.compiled(), 2);
    }

    #[test]
    fn test_unknown_field_of_map_values_is_rejected() {
        let out = compile(
            json!({
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "properties": {"port": {"type": "integer"}}
                }
            }),
            &["self.web.port > 0", "self.web.prot > 0"],
        );
        assert!(out.programs[0].is_some());
        assert!(out.programs[1].is_none());
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn test_presence_of_undeclared_field_compiles() {
        let out = compile(
            json!({"type": "object", "properties": {"a": {"type": "integer"}}}),
            &["has(self.zzz)"],
        );
        assert!(out.is_ok(), "{:?}", out.errors);
    }

    #[test]
    fn test_data_dependent_failures_compile() {
        let out = compile(
            json!({"type": "object", "properties": {"s": {"type": "string"}}}),
            &["int(s) > 0", "base64Decode(self.s) == b''"],
        );
        assert!(out.is_ok(), "{:?}", out.errors);
    }

    #[test]
    fn test_non_boolean_rule_is_rejected() {
        let out = compile(json!({"type": "integer"}), &["self + 1"]);
        let text = out.errors[0].to_string();
        assert!(text.contains("must evaluate to bool, got int"), "{text}");
    }

    #[test]
    fn test_nested_collections_compile() {
        assert!(compile(
            json!({
                "type": "object",
                "properties": {
                    "nestedObj": {"type": "array", "items": {"type": "array", "items": {"type": "string"}}}
                }
            }),
            &["size(self.nestedObj[0]) == 10"],
        )
        .is_ok());
        assert!(compile(
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "nestedObj": {"type": "object", "properties": {"val": {"type": "integer"}}}
                    }
                }
            }),
            &["self[0].nestedObj.val == 10"],
        )
        .is_ok());
    }

    #[test]
    fn test_declaration_error_fills_every_slot() {
        let s = schema(json!({
            "type": "array",
            "x-kubernetes-validations": [{"rule": "size(self) > 0"}, {"rule": "true"}]
        }));
        let out = compile_schema(&s, &RuleConfig::default());
        assert_eq!(out.programs.len(), 2);
        assert_eq!(out.compiled(), 0);
        assert!(matches!(out.errors[..], [CompileError::Declaration(_)]));
    }

    #[test]
    fn test_compile_schema_reads_configured_keys() {
        let s = schema(json!({
            "type": "integer",
            "x-rules": [{"rule": "obj >= 0", "message": "non-negative"}]
        }));
        let config = RuleConfig {
            scope_variable: "obj".to_string(),
            rule_extensions: vec!["x-rules".to_string()],
        };
        let out = compile_schema(&s, &config);
        assert!(out.is_ok(), "{:?}", out.errors);
        assert_eq!(out.compiled(), 1);
    }

    #[test]
    fn test_invalid_scope_fails_every_slot() {
        let out = compile_rules(&DeclType::Int, &[rule("true")], Some("no good"));
        assert_eq!(out.programs.len(), 1);
        assert!(matches!(out.errors[..], [CompileError::Environment(_)]));
    }
}
