//! # Rule Environment
//!
//! The variables visible to the rules of one schema node.
//!
//! Every environment binds the scope variable (`self` by default) to the
//! whole value at the node. An object root additionally binds each direct
//! field as a top-level variable, so `minReplicas` and `self.minReplicas`
//! resolve to the same value. Map, list and scalar roots expose only the
//! scope variable. Extension functions from [`crate::ext`] are registered
//! for every root kind.
//!
//! An environment is immutable once built. It owns one root engine context
//! holding the function table; each evaluation binds its variables in an
//! inner scope of that root, so one environment serves any number of
//! concurrent evaluations.
//!
//! A panic inside the engine (integer negation overflow, for one) is caught
//! and returned as an [`ExecutionError`] naming [`ENGINE_FAULT`].

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use cel::{Context, ExecutionError, Program, Value as CelValue};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{debug, warn};
use xval_core::is_identifier;

use crate::decl::DeclType;
use crate::ext;
use crate::value::to_cel_value;

/// Environment construction failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// The scope variable cannot be declared.
    #[error("invalid scope variable '{0}': must be a non-reserved identifier")]
    InvalidScopeVariable(String),
}

/// Function name carried by the error that replaces an engine panic.
pub const ENGINE_FAULT: &str = "<engine>";

/// The declared variables for one schema node's rules.
#[derive(Clone)]
pub struct Environment {
    scope_variable: String,
    root: DeclType,
    shorthands: BTreeMap<String, DeclType>,
    functions: Arc<Context<'static>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("scope_variable", &self.scope_variable)
            .field("root", &self.root)
            .field("shorthands", &self.shorthands)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.scope_variable == other.scope_variable
            && self.root == other.root
            && self.shorthands == other.shorthands
    }
}

impl Environment {
    /// Build the environment for a node declared as `root`.
    ///
    /// Fields whose names cannot be declared as variables (they collide with
    /// the scope variable, are reserved words, or are not identifiers) get
    /// no shorthand; rules reach them through the scope variable instead.
    pub fn new(root: DeclType, scope_variable: &str) -> Result<Self, EnvError> {
        if !is_identifier(scope_variable) {
            return Err(EnvError::InvalidScopeVariable(scope_variable.to_string()));
        }

        let mut shorthands = BTreeMap::new();
        if let DeclType::Object(obj) = &root {
            for (field, decl) in &obj.fields {
                if field == scope_variable || !is_identifier(field) {
                    warn!(
                        object = %obj.name,
                        field = %field,
                        "field cannot be declared as a top-level variable, skipping shorthand"
                    );
                    continue;
                }
                shorthands.insert(field.clone(), decl.clone());
            }
        }

        debug!(
            scope = scope_variable,
            root = %root,
            shorthands = shorthands.len(),
            "built rule environment"
        );

        let mut functions = Context::default();
        ext::register(&mut functions);

        Ok(Self {
            scope_variable: scope_variable.to_string(),
            root,
            shorthands,
            functions: Arc::new(functions),
        })
    }

    pub fn scope_variable(&self) -> &str {
        &self.scope_variable
    }

    pub fn root(&self) -> &DeclType {
        &self.root
    }

    /// The declared type of a top-level variable, the scope variable or a
    /// field shorthand.
    pub fn variable(&self, name: &str) -> Option<&DeclType> {
        if name == self.scope_variable {
            Some(&self.root)
        } else {
            self.shorthands.get(name)
        }
    }

    /// Field shorthands in name order.
    pub fn shorthands(&self) -> impl Iterator<Item = (&str, &DeclType)> {
        self.shorthands.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Run `program` against `instance`.
    ///
    /// Shorthands are bound only for fields present in the instance, so a
    /// rule reading an absent field fails at runtime.
    pub(crate) fn execute(
        &self,
        program: &Program,
        instance: &Json,
    ) -> Result<CelValue, ExecutionError> {
        let mut ctx = self.functions.new_inner_scope();
        ctx.add_variable_from_value(
            self.scope_variable.as_str(),
            to_cel_value(&self.root, instance),
        );
        if let Json::Object(entries) = instance {
            for (field, decl) in &self.shorthands {
                if let Some(value) = entries.get(field) {
                    ctx.add_variable_from_value(field.as_str(), to_cel_value(decl, value));
                }
            }
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| program.execute(&ctx)));
        outcome.unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "evaluation panicked".to_string());
            warn!(error = %message, "rule evaluation panicked");
            Err(ExecutionError::function_error(ENGINE_FAULT, message))
        })
    }
}
