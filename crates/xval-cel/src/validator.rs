//! # Tree-Wide Rule Validation
//!
//! [`RuleValidator`] compiles the rules attached to every node of a schema
//! tree once, then validates any number of instances against them.
//!
//! Each node's rules see that node's value as the scope variable. The
//! instance is walked alongside the schema:
//!
//! - object properties follow `properties`, keys not listed there follow
//!   `additionalProperties`;
//! - array elements follow `items`;
//! - absent fields and `null` values are skipped, since structural
//!   validation owns presence and nullability.
//!
//! Paths in reports use `.` between fields and `[i]` for array elements,
//! e.g. `spec.containers[2].name`. Schema paths in compile errors use `[*]`
//! for array items and `.*` for map values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value as Json;
use tracing::{debug, info};
use xval_core::{RuleConfig, Schema};

use crate::compile::{compile_schema, CompileError, CompiledRule};
use crate::eval::{evaluate_all, ValidationError};

/// A compile error at one schema node.
#[derive(Debug, Clone)]
pub struct NodeCompileError {
    /// Path of the node within the schema.
    pub path: String,
    pub error: CompileError,
}

impl fmt::Display for NodeCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.error)
        } else {
            write!(f, "{}: {}", self.path, self.error)
        }
    }
}

/// Rule failures found in one instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {e}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Node {
    programs: Vec<Option<CompiledRule>>,
    /// Every name under `properties`, including those pruned as inert.
    declared: BTreeSet<String>,
    properties: BTreeMap<String, Node>,
    items: Option<Box<Node>>,
    values: Option<Box<Node>>,
}

impl Node {
    /// Returns true if neither this node nor any descendant has a program.
    fn is_inert(&self) -> bool {
        self.programs.iter().all(Option::is_none)
            && self.properties.values().all(Node::is_inert)
            && self.items.as_ref().map_or(true, |n| n.is_inert())
            && self.values.as_ref().map_or(true, |n| n.is_inert())
    }
}

/// Compiled rules for a whole schema tree.
///
/// `Send + Sync`: compile once, validate from any thread.
#[derive(Debug)]
pub struct RuleValidator {
    root: Node,
    errors: Vec<NodeCompileError>,
    config: RuleConfig,
}

impl RuleValidator {
    /// Compile every rule in `schema`. Compile errors do not fail
    /// construction; they are reported by [`Self::compile_errors`] and the
    /// affected rules are skipped during validation.
    pub fn new(schema: &Schema, config: RuleConfig) -> Self {
        let mut errors = Vec::new();
        let root = build_node(schema, &config, String::new(), &mut errors);
        info!(compile_errors = errors.len(), "compiled schema rules");
        Self {
            root,
            errors,
            config,
        }
    }

    /// Every compile error in the tree, in depth-first order.
    pub fn compile_errors(&self) -> &[NodeCompileError] {
        &self.errors
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    /// Number of rules that compiled, across the tree.
    pub fn rule_count(&self) -> usize {
        fn count(node: &Node) -> usize {
            node.programs.iter().flatten().count()
                + node.properties.values().map(count).sum::<usize>()
                + node.items.as_deref().map_or(0, count)
                + node.values.as_deref().map_or(0, count)
        }
        count(&self.root)
    }

    /// Evaluate every compiled rule against `instance`.
    pub fn validate(&self, instance: &Json) -> ValidationReport {
        let mut errors = Vec::new();
        walk(&self.root, "", instance, &mut errors);
        debug!(count = errors.len(), "rule validation finished");
        ValidationReport { errors }
    }
}

fn build_node(
    schema: &Schema,
    config: &RuleConfig,
    path: String,
    errors: &mut Vec<NodeCompileError>,
) -> Node {
    let mut node = Node::default();

    if schema.has_rules(config.rule_extensions.as_slice()) {
        let compilation = compile_schema(schema, config);
        errors.extend(compilation.errors.into_iter().map(|error| NodeCompileError {
            path: path.clone(),
            error,
        }));
        node.programs = compilation.programs;
    }

    for (field, child) in &schema.properties {
        node.declared.insert(field.clone());
        let child = build_node(child, config, join(&path, field), errors);
        if !child.is_inert() {
            node.properties.insert(field.clone(), child);
        }
    }
    if let Some(items) = schema.items.as_deref() {
        let child = build_node(items, config, format!("{path}[*]"), errors);
        if !child.is_inert() {
            node.items = Some(Box::new(child));
        }
    }
    if let Some(values) = schema.map_values() {
        let child = build_node(values, config, join(&path, "*"), errors);
        if !child.is_inert() {
            node.values = Some(Box::new(child));
        }
    }
    node
}

fn walk(node: &Node, path: &str, instance: &Json, errors: &mut Vec<ValidationError>) {
    if instance.is_null() {
        return;
    }
    errors.extend(evaluate_all(&node.programs, path, instance));

    match instance {
        Json::Object(entries) => {
            for (key, value) in entries {
                let child = if node.declared.contains(key) {
                    node.properties.get(key)
                } else {
                    node.values.as_deref()
                };
                if let Some(child) = child {
                    walk(child, &join(path, key), value, errors);
                }
            }
        }
        Json::Array(items) => {
            if let Some(child) = node.items.as_deref() {
                for (i, item) in items.iter().enumerate() {
                    walk(child, &format!("{path}[{i}]"), item, errors);
                }
            }
        }
        _ => {}
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator(value: Json) -> RuleValidator {
        RuleValidator::new(&Schema::from_value(value).unwrap(), RuleConfig::default())
    }

    fn deployment() -> RuleValidator {
        validator(json!({
            "type": "object",
            "properties": {
                "spec": {
                    "type": "object",
                    "x-kubernetes-validations": [
                        {"rule": "minReplicas <= maxReplicas", "message": "min must not exceed max"}
                    ],
                    "properties": {
                        "minReplicas": {"type": "integer"},
                        "maxReplicas": {"type": "integer"},
                        "containers": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": {
                                        "type": "string",
                                        "x-kubernetes-validations": [
                                            {"rule": "size(self) > 0", "message": "name is empty"}
                                        ]
                                    }
                                }
                            }
                        },
                        "labels": {
                            "type": "object",
                            "additionalProperties": {
                                "type": "string",
                                "x-kubernetes-validations": [
                                    {"rule": "self.lowerAscii() == self", "message": "label must be lowercase"}
                                ]
                            }
                        }
                    }
                }
            }
        }))
    }

    #[test]
    fn test_compiles_every_node() {
        let v = deployment();
        assert!(v.compile_errors().is_empty(), "{:?}", v.compile_errors());
        assert_eq!(v.rule_count(), 3);
    }

    #[test]
    fn test_valid_instance_passes() {
        let report = deployment().validate(&json!({
            "spec": {
                "minReplicas": 1,
                "maxReplicas": 3,
                "containers": [{"name": "web"}],
                "labels": {"app": "web"}
            }
        }));
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn test_errors_carry_instance_paths() {
        let report = deployment().validate(&json!({
            "spec": {
                "minReplicas": 5,
                "maxReplicas": 3,
                "containers": [{"name": "web"}, {"name": ""}],
                "labels": {"app": "Web"}
            }
        }));
        let paths: Vec<&str> = report.errors().iter().map(ValidationError::path).collect();
        assert_eq!(paths, vec!["spec", "spec.containers[1].name", "spec.labels.app"]);
        assert!(report.to_string().contains("spec: min must not exceed max"));
    }

    #[test]
    fn test_null_and_absent_values_are_skipped() {
        let report = deployment().validate(&json!({"spec": {"containers": [{"name": null}]}}));
        assert_eq!(report.len(), 1, "{report}");
        assert!(report.errors()[0].is_runtime_error());
        assert!(deployment().validate(&json!({})).is_empty());
    }

    #[test]
    fn test_compile_errors_carry_schema_paths() {
        let v = validator(json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "integer",
                        "x-kubernetes-validations": [{"rule": "size(self) == 10"}, {"rule": ""}]
                    }
                }
            }
        }));
        let paths: Vec<&str> = v.compile_errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["items[*]", "items[*]"]);
        assert_eq!(v.rule_count(), 0);
        assert!(v.compile_errors()[1]
            .to_string()
            .ends_with("rule 1: rule is not specified"));
    }

    #[test]
    fn test_declared_properties_skip_additional_rules() {
        let v = validator(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": {
                "type": "boolean",
                "x-kubernetes-validations": [{"rule": "self == true", "message": "must be true"}]
            }
        }));
        assert!(v.compile_errors().is_empty(), "{:?}", v.compile_errors());
        assert!(v.validate(&json!({"name": "x", "flag": true})).is_empty());
        let report = v.validate(&json!({"name": "x", "flag": false}));
        assert_eq!(report.to_string(), "  flag: must be true");
    }

    #[test]
    fn test_root_rules_report_root_path() {
        let v = validator(json!({
            "type": "integer",
            "x-kubernetes-validations": [{"rule": "self > 0", "message": "positive"}]
        }));
        let report = v.validate(&json!(0));
        assert_eq!(report.to_string(), "  <root>: positive");
    }
}
