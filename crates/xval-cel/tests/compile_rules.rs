//! Integration test: rule compilation across every supported schema shape.
//!
//! Each case builds the declaration for a schema, compiles one rule against
//! it, and checks the expected number of compile errors.

use serde_json::{json, Value};
use xval_cel::{build_declaration, compile_rules, CompileError};
use xval_core::{Schema, ValidationRule};

fn compile_errors(schema: Value, rule: &str) -> Vec<CompileError> {
    let schema = Schema::from_value(schema).unwrap();
    let decl = build_declaration(&schema, "self").unwrap();
    compile_rules(&decl, &[ValidationRule::new(rule, "")], Some("self")).errors
}

fn assert_compiles(schema: Value, rule: &str) {
    let errors = compile_errors(schema, rule);
    assert!(errors.is_empty(), "rule '{rule}' should compile: {errors:?}");
}

#[test]
fn test_valid_object() {
    assert_compiles(
        json!({
            "type": "object",
            "properties": {
                "minReplicas": {"type": "integer", "format": "int64"},
                "maxReplicas": {"type": "integer", "format": "int64"}
            }
        }),
        "minReplicas < maxReplicas",
    );
}

#[test]
fn test_valid_string() {
    assert_compiles(json!({"type": "string"}), "self.startsWith('s')");
}

#[test]
fn test_valid_byte() {
    assert_compiles(
        json!({"type": "string", "format": "byte"}),
        "string(self).endsWith('s')",
    );
}

#[test]
fn test_valid_boolean() {
    assert_compiles(json!({"type": "boolean"}), "self == true");
}

#[test]
fn test_valid_integer() {
    assert_compiles(json!({"type": "integer"}), "self > 0");
}

#[test]
fn test_valid_number() {
    assert_compiles(json!({"type": "number"}), "self > 1.0");
}

#[test]
fn test_valid_nested_object() {
    assert_compiles(
        json!({
            "type": "object",
            "properties": {
                "nestedObj": {
                    "type": "object",
                    "properties": {"val": {"type": "integer", "format": "int64"}}
                }
            }
        }),
        "nestedObj.val == 10",
    );
}

#[test]
fn test_valid_nested_object_of_array() {
    assert_compiles(
        json!({
            "type": "object",
            "properties": {
                "nestedObj": {
                    "type": "array",
                    "items": {"type": "array", "items": {"type": "string"}}
                }
            }
        }),
        "size(self.nestedObj[0]) == 10",
    );
}

#[test]
fn test_valid_array_of_array() {
    assert_compiles(
        json!({
            "type": "array",
            "items": {"type": "array", "items": {"type": "array", "items": {"type": "string"}}}
        }),
        "size(self[0][0]) == 10",
    );
}

#[test]
fn test_valid_array_of_object() {
    assert_compiles(
        json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "nestedObj": {
                        "type": "object",
                        "properties": {"val": {"type": "integer", "format": "int64"}}
                    }
                }
            }
        }),
        "self[0].nestedObj.val == 10",
    );
}

#[test]
fn test_valid_map() {
    assert_compiles(
        json!({
            "type": "object",
            "additionalProperties": {"type": "boolean", "nullable": false}
        }),
        "size(self) > 0",
    );
}

#[test]
fn test_valid_string_extensions() {
    assert_compiles(json!({"type": "string"}), "self.lowerAscii().trim() == self");
    assert_compiles(json!({"type": "string"}), "self.split('/').join('/') == self");
    assert_compiles(
        json!({"type": "string", "format": "byte"}),
        "size(base64Decode(self)) >= 0",
    );
}

#[test]
fn test_invalid_number() {
    let errors = compile_errors(json!({"type": "number"}), "size(self) == 10");
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], CompileError::Compilation { .. }));
}

#[test]
fn test_invalid_integer() {
    let errors = compile_errors(json!({"type": "integer"}), "size(self) == 10");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().starts_with("compilation failed for rule"));
}

#[test]
fn test_empty_rule_any_shape() {
    let shapes = [
        json!({"type": "integer"}),
        json!({"type": "number"}),
        json!({"type": "string"}),
        json!({"type": "boolean"}),
        json!({"type": "array", "items": {"type": "string"}}),
        json!({"type": "object", "properties": {"a": {"type": "string"}}}),
        json!({"type": "object", "additionalProperties": {"type": "integer"}}),
    ];
    for shape in shapes {
        let errors = compile_errors(shape.clone(), "");
        assert_eq!(errors.len(), 1, "{shape}");
        assert!(
            errors[0].to_string().contains("rule is not specified"),
            "{shape}: {}",
            errors[0]
        );
    }
}

#[test]
fn test_bare_list_root_has_no_field_shorthand() {
    let schema = json!({
        "type": "array",
        "items": {"type": "object", "properties": {"name": {"type": "string"}}}
    });
    assert_compiles(schema.clone(), "self.all(x, size(x.name) > 0)");
    assert_eq!(compile_errors(schema, "name == ''").len(), 1);
}
