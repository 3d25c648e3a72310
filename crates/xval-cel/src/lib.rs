//! # xval-cel: Schema-Attached Rule Compilation and Evaluation
//!
//! Compiles the CEL rules attached to schema nodes once and evaluates them
//! cheaply against many instances.
//!
//! ## Pipeline
//!
//! ```text
//! Schema node ──▶ build_declaration ──▶ DeclType
//!                                         │
//!            rules ──▶ compile_rules ◀────┘
//!                          │
//!                          ▼
//!          Vec<Option<CompiledRule>> + Vec<CompileError>
//!                          │
//!       instance ──▶ CompiledRule::evaluate ──▶ Option<ValidationError>
//! ```
//!
//! [`RuleValidator`] runs the pipeline for every node of a schema tree and
//! walks instances alongside it.
//!
//! ## Concurrency
//!
//! Compiled rules are immutable and `Send + Sync`. Each evaluation binds its
//! variables in a fresh inner scope of the environment's shared engine
//! context, so one compiled schema serves concurrent callers without
//! locking.

pub mod compile;
pub mod decl;
pub mod env;
pub mod eval;
pub mod ext;
pub mod validator;
pub mod value;

pub use compile::{compile_rules, compile_schema, CompileError, CompiledRule, RuleCompilation};
pub use decl::{build_declaration, DeclError, DeclType, ObjectDecl};
pub use env::{EnvError, Environment, ENGINE_FAULT};
pub use eval::{evaluate_all, ValidationError};
pub use validator::{NodeCompileError, RuleValidator, ValidationReport};
