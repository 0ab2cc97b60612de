//! Request compilation.
//!
//! A [`Compiler`] owns the validated schema and turns one [`Operation`] plus
//! the caller's [`RequestContext`] into a single parameterized statement.
//! Each request walks `Planning -> PredicateResolution -> AuthorizeBefore ->
//! Emit -> AuthorizeAfter` (the last for writes only); any failure rejects
//! the request before a statement exists.

mod aggregate;
mod connection;
mod errors;
mod options;
mod projection;
mod read;
mod search;
mod write;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::auth::{self, AuthInjector, Verdict};
use crate::context::RequestContext;
use crate::cypher::{Env, Predicate};
use crate::filter::{FilterBuilder, Scope};
use crate::request::Operation;
use crate::schema::{AuthOperation, Entity, Schema, ValidationTiming};
use crate::shape::Shape;
use crate::value::{Params, Value};
use crate::Result;

pub use errors::{CompileError, CompileErrorWithCode};
pub use options::CompilerOptions;

/// Variable bound to the root node of every statement.
pub(crate) const ROOT: &str = "this";

/// Whether a statement only reads.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Read-only.
    Read,
    /// Mutates the store.
    Write,
}

/// Output of one compilation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledStatement {
    /// Statement text.
    pub cypher: String,
    /// Parameters referenced by the statement.
    pub params: Params,
    /// Read or write.
    pub kind: StatementKind,
    /// Post-processing applied to each returned `this` value.
    pub shape: Shape,
}

/// Compilation phases, traced per request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Resolving entities, indexes and windows.
    Planning,
    /// Building filter predicates.
    PredicateResolution,
    /// Evaluating rules that must hold before the operation.
    AuthorizeBefore,
    /// Rendering the statement.
    Emit,
    /// Emitting checks that must hold after a write.
    AuthorizeAfter,
}

pub(crate) fn enter(phase: Phase) {
    trace!(?phase, "compile phase");
}

/// Compiles requests against a fixed schema.
#[derive(Clone, Debug)]
pub struct Compiler {
    schema: Arc<Schema>,
    options: CompilerOptions,
}

impl Compiler {
    /// Creates a compiler.
    pub fn new(schema: Arc<Schema>, options: CompilerOptions) -> Self {
        Self { schema, options }
    }

    /// Schema the compiler resolves against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Compiles one operation for the caller described by `ctx`.
    pub fn compile(&self, operation: &Operation, ctx: &RequestContext) -> Result<CompiledStatement> {
        let session = Ctx::new(&self.schema, &self.options, ctx);
        let mut env = Env::new();
        enter(Phase::Planning);
        let emitted = match operation {
            Operation::Read(request) => session.read(&mut env, request),
            Operation::Connection(request) => session.connection(&mut env, request),
            Operation::Aggregate(request) => session.aggregate(&mut env, request),
            Operation::Search(request) => session.search(&mut env, request),
            Operation::Create(request) => session.create(&mut env, request),
            Operation::Delete(request) => session.delete(&mut env, request),
        };
        let (cypher, kind, shape) = match emitted {
            Ok(emitted) => emitted,
            Err(err) => {
                debug!(operation = operation.name(), error = %err, "request rejected");
                return Err(err);
            }
        };
        let params = env.into_params();
        debug!(
            operation = operation.name(),
            params = params.len(),
            cypher = %cypher,
            "compiled statement"
        );
        Ok(CompiledStatement {
            cypher,
            params,
            kind,
            shape,
        })
    }
}

pub(crate) type Emitted = (String, StatementKind, Shape);

/// Per-request compilation state shared by every operation.
pub(crate) struct Ctx<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) options: &'a CompilerOptions,
    pub(crate) filters: FilterBuilder<'a>,
    pub(crate) auth: AuthInjector<'a>,
}

impl<'a> Ctx<'a> {
    fn new(schema: &'a Schema, options: &'a CompilerOptions, request: &'a RequestContext) -> Self {
        Self {
            schema,
            options,
            filters: FilterBuilder::new(schema),
            auth: AuthInjector::new(schema, request),
        }
    }

    pub(crate) fn entity(&self, name: &str) -> std::result::Result<&'a Entity, CompileError> {
        self.schema
            .entity(name)
            .ok_or_else(|| CompileError::UnknownEntity {
                entity: name.to_owned(),
            })
    }

    /// Caller filter ANDed with the entity's filter rules.
    pub(crate) fn node_predicate(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: &str,
        filter: Option<&Value>,
        operation: AuthOperation,
    ) -> std::result::Result<Predicate, CompileError> {
        enter(Phase::PredicateResolution);
        let requested = match filter {
            Some(filter) if !filter.is_null() => {
                self.filters.build(env, Scope::node(entity, var), filter)?
            }
            _ => Predicate::True,
        };
        let narrowed = self.auth.filter(env, entity, var, operation)?;
        Ok(Predicate::and([requested, narrowed]))
    }

    /// Row-level read validation, `None` when nothing must be checked.
    pub(crate) fn read_validation(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: &str,
        operation: AuthOperation,
    ) -> Result<Option<String>> {
        enter(Phase::AuthorizeBefore);
        match self
            .auth
            .validate(env, entity, Some(var), operation, ValidationTiming::Before)?
        {
            Verdict::Pass => Ok(None),
            Verdict::Check(check) => Ok(Some(auth::validate_predicate_clause(
                &self.options.validate_predicate_function,
                &check,
            ))),
        }
    }

    /// Standalone write validation, `None` when nothing must be checked.
    pub(crate) fn write_validation(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: &str,
        operation: AuthOperation,
        timing: ValidationTiming,
    ) -> Result<Option<String>> {
        enter(match timing {
            ValidationTiming::Before => Phase::AuthorizeBefore,
            ValidationTiming::After => Phase::AuthorizeAfter,
        });
        match self.auth.validate(env, entity, Some(var), operation, timing)? {
            Verdict::Pass => Ok(None),
            Verdict::Check(check) => Ok(Some(format!(
                "WITH *\n{}",
                auth::validate_call_clause(&self.options.validate_procedure, &check)
            ))),
        }
    }
}

/// Appends `WHERE <pred>` to `lines` unless the predicate is trivially true.
pub(crate) fn push_where(lines: &mut Vec<String>, pred: &Predicate) {
    if !pred.is_true() {
        lines.push(format!("WHERE {pred}"));
    }
}
