//! Authorization injection.
//!
//! Filter rules narrow what a caller can see and never raise; a caller who
//! fails every applicable filter rule simply sees zero rows. Validate rules
//! must hold: failures decidable from the claims alone abort compilation
//! with [`Error::Forbidden`], and node-dependent checks are emitted into the
//! statement so the store aborts the whole operation with the
//! [`FORBIDDEN_MARKER`] error, which the executor layer maps back to
//! `Forbidden`.
//!
//! Several applicable rules of the same kind are alternatives: access is
//! granted when any one of them holds.

pub mod jwt;

use tracing::trace;

use crate::compiler::CompileError;
use crate::context::RequestContext;
use crate::cypher::{Env, Predicate};
use crate::filter::{map_leaves, FilterBuilder, Scope};
use crate::schema::{AuthOperation, Entity, RuleWhere, Schema, ValidationTiming};
use crate::value::Value;
use crate::{Error, Result};

/// Message raised by emitted validation checks.
pub const FORBIDDEN_MARKER: &str = "@cypherforge/FORBIDDEN";

/// Prefix marking a claim placeholder inside node conditions.
pub const JWT_PLACEHOLDER: &str = "$jwt.";

/// Outcome of validate-rule evaluation that did not fail outright.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Nothing to check at runtime.
    Pass,
    /// The predicate must hold for every affected node.
    Check(Predicate),
}

/// Produces authorization fragments for one request.
pub struct AuthInjector<'a> {
    builder: FilterBuilder<'a>,
    ctx: &'a RequestContext,
}

impl<'a> AuthInjector<'a> {
    /// Creates an injector for the caller described by `ctx`.
    pub fn new(schema: &'a Schema, ctx: &'a RequestContext) -> Self {
        Self {
            builder: FilterBuilder::new(schema),
            ctx,
        }
    }

    /// Predicate ANDed into the caller's filter; `true` when no rule applies.
    pub fn filter(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: &str,
        operation: AuthOperation,
    ) -> std::result::Result<Predicate, CompileError> {
        let rules: Vec<_> = entity
            .authorization
            .filter
            .iter()
            .filter(|rule| rule.applies(operation))
            .collect();
        if rules.is_empty() {
            return Ok(Predicate::True);
        }
        let mut alternatives = Vec::with_capacity(rules.len());
        for rule in rules {
            alternatives.push(self.rule_predicate(
                env,
                entity,
                Some(var),
                rule.require_authentication,
                &rule.condition,
            )?);
        }
        let pred = Predicate::or(alternatives);
        trace!(entity = %entity.name, ?operation, narrowed = !pred.is_true(), "auth filter");
        Ok(pred)
    }

    /// Evaluates validate rules for `operation` at `timing`.
    ///
    /// `var` is `None` when no node exists yet (before a create); node
    /// conditions are then skipped and only claims are checked.
    pub fn validate(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: Option<&str>,
        operation: AuthOperation,
        timing: ValidationTiming,
    ) -> Result<Verdict> {
        let rules: Vec<_> = entity
            .authorization
            .validate
            .iter()
            .filter(|rule| rule.applies(operation, timing))
            .collect();
        if rules.is_empty() {
            return Ok(Verdict::Pass);
        }
        let mut alternatives = Vec::with_capacity(rules.len());
        for rule in rules {
            alternatives.push(self.rule_predicate(
                env,
                entity,
                var,
                rule.require_authentication,
                &rule.condition,
            )?);
        }
        match Predicate::or(alternatives) {
            Predicate::True => Ok(Verdict::Pass),
            Predicate::False => {
                trace!(entity = %entity.name, ?operation, ?timing, "auth validate rejected");
                Err(Error::Forbidden)
            }
            check => Ok(Verdict::Check(check)),
        }
    }

    fn rule_predicate(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: Option<&str>,
        require_authentication: bool,
        condition: &RuleWhere,
    ) -> std::result::Result<Predicate, CompileError> {
        if require_authentication && !self.ctx.is_authenticated() {
            return Ok(Predicate::False);
        }
        if let Some(jwt) = &condition.jwt {
            if !jwt::evaluate(jwt, self.ctx.claims())? {
                return Ok(Predicate::False);
            }
        }
        let (Some(node), Some(var)) = (&condition.node, var) else {
            return Ok(Predicate::True);
        };
        let Some(resolved) = self.resolve_placeholders(node) else {
            return Ok(Predicate::False);
        };
        self.builder.build(env, Scope::node(entity, var), &resolved)
    }

    /// Replaces `"$jwt.<path>"` leaves with claim values; `None` if any
    /// referenced claim is missing.
    fn resolve_placeholders(&self, node: &Value) -> Option<Value> {
        map_leaves(node, &mut |leaf| match leaf.as_str() {
            Some(text) if text.starts_with(JWT_PLACEHOLDER) => {
                let path = &text[JWT_PLACEHOLDER.len()..];
                self.ctx.claims()?.get(path).cloned()
            }
            _ => Some(leaf.clone()),
        })
    }
}

/// Row-level check for reads: `WITH * WHERE <fn>(NOT (<pred>), ...)`.
pub fn validate_predicate_clause(function: &str, check: &Predicate) -> String {
    format!("WITH *\nWHERE {function}(NOT ({check}), \"{FORBIDDEN_MARKER}\", [0])")
}

/// Standalone check for writes: `CALL <proc>(NOT (<pred>), ...)`.
pub fn validate_call_clause(procedure: &str, check: &Predicate) -> String {
    format!("CALL {procedure}(NOT ({check}), \"{FORBIDDEN_MARKER}\", [0])")
}
