//! # xval CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xval_cli::check::{run_check, CheckArgs};
use xval_cli::load_config;
use xval_cli::validate::{run_validate, ValidateArgs};

/// xval: validate documents against schemas carrying CEL rules.
///
/// Rules are read from vendor extensions on schema nodes
/// (`x-kubernetes-validations` by default), compiled once, and evaluated
/// against every document.
#[derive(Parser, Debug)]
#[command(name = "xval", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a rule configuration file (YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile every rule in a schema and report compile errors.
    Check(CheckArgs),

    /// Validate documents against a schema's structure and rules.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        tracing::debug!(scope = %config.scope_variable, "loaded rule configuration");
        match cli.command {
            Commands::Check(args) => run_check(&args, &config),
            Commands::Validate(args) => run_validate(&args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
