//! # Validate Subcommand
//!
//! Validates documents against a schema in two passes: structural
//! validation first, then the schema's rules. Rules only run on documents
//! that are structurally valid, since they assume the declared shape.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use xval_cel::RuleValidator;
use xval_core::RuleConfig;
use xval_schema::StructuralValidator;

/// Arguments for the `xval validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema file (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Documents to validate (JSON or YAML).
    #[arg(value_name = "DOCUMENT", required = true)]
    pub documents: Vec<PathBuf>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every document passes, 1 on any failure or
/// rule compile error.
pub fn run_validate(args: &ValidateArgs, config: &RuleConfig) -> Result<u8> {
    let (schema, raw) = xval_schema::load_schema(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let structural = StructuralValidator::new(&raw)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to compile schema {}", args.schema.display()))?;
    let rules = RuleValidator::new(&schema, config.clone());

    tracing::info!(
        schema = %args.schema.display(),
        rules = rules.rule_count(),
        documents = args.documents.len(),
        "loaded schema"
    );

    let mut had_failures = !rules.compile_errors().is_empty();
    for error in rules.compile_errors() {
        println!("  ERROR: {error}");
    }

    let mut passed = 0usize;
    for path in &args.documents {
        if validate_document(path, &structural, &rules) {
            passed += 1;
        } else {
            had_failures = true;
        }
    }

    println!("Documents: {}/{} passed", passed, args.documents.len());
    Ok(if had_failures { 1 } else { 0 })
}

/// Validate one document and print its outcome. Returns true on pass.
fn validate_document(path: &Path, structural: &StructuralValidator, rules: &RuleValidator) -> bool {
    let document = match xval_schema::load_document(path) {
        Ok(document) => document,
        Err(e) => {
            println!("FAIL: {}: {e}", path.display());
            return false;
        }
    };

    let violations = structural.validate(&document);
    if !violations.is_empty() {
        println!("FAIL: {} ({} structural violation(s))", path.display(), violations.len());
        println!("{violations}");
        return false;
    }

    let report = rules.validate(&document);
    if !report.is_empty() {
        println!("FAIL: {} ({} rule violation(s))", path.display(), report.len());
        println!("{report}");
        return false;
    }

    println!("PASS: {}", path.display());
    true
}
