//! # Check Subcommand
//!
//! Compiles every rule attached to a schema and reports compile errors with
//! the schema path of the node that carries them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use xval_cel::RuleValidator;
use xval_core::RuleConfig;

/// Arguments for the `xval check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema file (JSON or YAML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 when every rule compiles, 1 otherwise.
pub fn run_check(args: &CheckArgs, config: &RuleConfig) -> Result<u8> {
    let (schema, _) = xval_schema::load_schema(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let validator = RuleValidator::new(&schema, config.clone());
    let errors = validator.compile_errors();

    println!(
        "{}: {} rule(s) compiled, {} error(s)",
        args.schema.display(),
        validator.rule_count(),
        errors.len()
    );
    for error in errors {
        println!("  ERROR: {error}");
    }

    Ok(if errors.is_empty() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_file, REPLICA_SCHEMA};

    #[test]
    fn test_check_clean_schema() {
        let file = write_file(REPLICA_SCHEMA, "yaml");
        let args = CheckArgs {
            schema: file.path().to_path_buf(),
        };
        assert_eq!(run_check(&args, &RuleConfig::default()).unwrap(), 0);
    }

    #[test]
    fn test_check_reports_bad_rules() {
        let file = write_file(
            r#"{"type": "integer", "x-kubernetes-validations": [{"rule": "size(self) == 10"}]}"#,
            "json",
        );
        let args = CheckArgs {
            schema: file.path().to_path_buf(),
        };
        assert_eq!(run_check(&args, &RuleConfig::default()).unwrap(), 1);
    }

    #[test]
    fn test_check_missing_schema_is_an_error() {
        let args = CheckArgs {
            schema: PathBuf::from("/nonexistent/schema.yaml"),
        };
        assert!(run_check(&args, &RuleConfig::default()).is_err());
    }
}
