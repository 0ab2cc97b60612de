//! Predicate builder: turns structured filter input into a [`Predicate`]
//! plus parameter bindings.
//!
//! Filter input is a map whose keys are field names carrying an optional
//! operator suffix (see [`operator`]), the logical combinators `AND`, `OR`
//! and `NOT`, relationship quantifiers, and, inside search operations only,
//! `score: { min, max }`. The builder never touches shared state; every value
//! it binds goes through the request's [`Env`].

pub mod coerce;
pub mod operator;

use std::collections::BTreeMap;

use crate::compiler::CompileError;
use crate::cypher::{property_access, relationship_pattern, Env, Predicate};
use crate::schema::{Entity, Field, FieldKind, Relationship, ScalarType, Schema};
use crate::value::Value;

pub use operator::Operator;

type BuildResult = Result<Predicate, CompileError>;

/// Fields a filter may reference.
#[derive(Clone, Copy, Debug)]
pub enum FieldSource<'a> {
    /// Fields of an entity, relationships included.
    Entity(&'a Entity),
    /// Properties of a relationship.
    Edge {
        /// Entity declaring the relationship.
        owner: &'a Entity,
        /// Declared relationship field name.
        field: &'a str,
        /// Relationship definition.
        rel: &'a Relationship,
    },
}

impl<'a> FieldSource<'a> {
    fn lookup(&self, name: &str) -> Option<&'a Field> {
        match self {
            FieldSource::Entity(entity) => entity.field(name),
            FieldSource::Edge { rel, .. } => rel.property(name),
        }
    }

    fn owner_name(&self) -> String {
        match self {
            FieldSource::Entity(entity) => entity.name.clone(),
            FieldSource::Edge { owner, field, .. } => format!("{}.{}", owner.name, field),
        }
    }
}

/// Where a filter is evaluated: the fields in reach, the variable bound to
/// them, and the score variable when inside a search.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    /// Fields in reach.
    pub source: FieldSource<'a>,
    /// Variable bound to the node or relationship.
    pub var: &'a str,
    /// Score variable, present only inside search operations.
    pub score: Option<&'a str>,
}

impl<'a> Scope<'a> {
    /// Scope over an entity's node variable.
    pub fn node(entity: &'a Entity, var: &'a str) -> Self {
        Self {
            source: FieldSource::Entity(entity),
            var,
            score: None,
        }
    }

    /// Scope over a relationship variable.
    pub fn edge(owner: &'a Entity, field: &'a str, rel: &'a Relationship, var: &'a str) -> Self {
        Self {
            source: FieldSource::Edge { owner, field, rel },
            var,
            score: None,
        }
    }

    /// Makes the search score available to `score` keys.
    pub fn with_score(mut self, score: Option<&'a str>) -> Self {
        self.score = score;
        self
    }
}

/// Scope of a connection-shaped filter (`{ node, edge, score }`).
#[derive(Clone, Copy, Debug)]
pub struct ConnectionScope<'a> {
    /// Node part.
    pub node: Scope<'a>,
    /// Edge part, absent for top-level and search connections.
    pub edge: Option<Scope<'a>>,
    /// Score variable for search connections.
    pub score: Option<&'a str>,
}

/// Stateless builder over a schema.
#[derive(Clone, Copy, Debug)]
pub struct FilterBuilder<'a> {
    schema: &'a Schema,
}

impl<'a> FilterBuilder<'a> {
    /// Creates a builder resolving relationship targets through `schema`.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Builds a predicate for `filter` evaluated in `scope`.
    pub fn build(&self, env: &mut Env, scope: Scope<'_>, filter: &Value) -> BuildResult {
        let map = filter
            .as_map()
            .ok_or_else(|| CompileError::expected_object("where", filter))?;
        let mut parts = Vec::with_capacity(map.len());
        for (key, value) in map {
            parts.push(self.build_entry(env, scope, key, value)?);
        }
        Ok(Predicate::and(parts))
    }

    /// Builds a connection-shaped filter (`node`, `edge`, `score`, combinators).
    pub fn build_connection(
        &self,
        env: &mut Env,
        scope: ConnectionScope<'_>,
        filter: &Value,
    ) -> BuildResult {
        let map = filter
            .as_map()
            .ok_or_else(|| CompileError::expected_object("where", filter))?;
        let mut parts = Vec::with_capacity(map.len());
        for (key, value) in map {
            let part = match key.as_str() {
                "AND" | "OR" => {
                    let items = value
                        .as_list()
                        .ok_or_else(|| CompileError::expected_list(key.as_str(), value))?;
                    let built = items
                        .iter()
                        .map(|item| self.build_connection(env, scope, item))
                        .collect::<Result<Vec<_>, _>>()?;
                    if key == "AND" {
                        Predicate::and(built)
                    } else {
                        Predicate::or(built)
                    }
                }
                "NOT" => self.build_connection(env, scope, value)?.negate(),
                "node" => self.build(env, scope.node, value)?,
                "edge" => match scope.edge {
                    Some(edge) => self.build(env, edge, value)?,
                    None => return Err(CompileError::EdgeOutsideConnection),
                },
                "score" => match scope.score {
                    Some(score) => score_range(env, score, value)?,
                    None => return Err(CompileError::ScoreOutsideSearch),
                },
                other => {
                    return Err(CompileError::InvalidOperator {
                        field: other.to_owned(),
                        operator: "connection filter".to_owned(),
                    })
                }
            };
            parts.push(part);
        }
        Ok(Predicate::and(parts))
    }

    fn build_entry(&self, env: &mut Env, scope: Scope<'_>, key: &str, value: &Value) -> BuildResult {
        match key {
            "AND" | "OR" => {
                let items = value
                    .as_list()
                    .ok_or_else(|| CompileError::expected_list(key, value))?;
                let built = items
                    .iter()
                    .map(|item| self.build(env, scope, item))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(if key == "AND" {
                    Predicate::and(built)
                } else {
                    Predicate::or(built)
                });
            }
            "NOT" => return Ok(self.build(env, scope, value)?.negate()),
            _ => {}
        }

        if let Some(base) = key.strip_suffix("Connection").map(str::to_owned) {
            if let Some(pred) = self.try_connection_key(env, scope, &base, None, value)? {
                return Ok(pred);
            }
        }
        if let Some((prefix, op)) = split_connection_key(key) {
            if let Some(pred) = self.try_connection_key(env, scope, prefix, Some(op), value)? {
                return Ok(pred);
            }
        }

        let Some((name, op)) = operator::parse_key(key, |name| scope.source.lookup(name).is_some())
        else {
            if key == "score" {
                return match scope.score {
                    Some(score) => score_range(env, score, value),
                    None => Err(CompileError::ScoreOutsideSearch),
                };
            }
            return Err(CompileError::unknown_field(scope.source.owner_name(), key));
        };
        let field = scope
            .source
            .lookup(name)
            .ok_or_else(|| CompileError::unknown_field(scope.source.owner_name(), name))?;

        match &field.kind {
            FieldKind::Scalar(ty) => scalar_predicate(env, scope.var, field, *ty, op, value),
            FieldKind::Relationship(rel) => {
                let FieldSource::Entity(owner) = scope.source else {
                    return Err(CompileError::NotAScalar {
                        entity: scope.source.owner_name(),
                        field: name.to_owned(),
                    });
                };
                self.relationship_predicate(env, scope.var, owner, field, rel, op, value)
            }
        }
    }

    /// Handles `rel` + `Connection` keys; returns `None` when `base` is not a
    /// relationship of the scope so the key falls through to plain parsing.
    fn try_connection_key(
        &self,
        env: &mut Env,
        scope: Scope<'_>,
        base: &str,
        op: Option<Operator>,
        value: &Value,
    ) -> Result<Option<Predicate>, CompileError> {
        let FieldSource::Entity(owner) = scope.source else {
            return Ok(None);
        };
        let Some(field) = owner.field(base) else {
            return Ok(None);
        };
        let Some(rel) = field.relationship_def() else {
            return Ok(None);
        };
        let target = self.target(rel)?;
        let op = op.unwrap_or(Operator::Some);
        if !op.is_quantifier() {
            return Err(CompileError::InvalidOperator {
                field: format!("{base}Connection"),
                operator: op.suffix().to_owned(),
            });
        }

        let rel_var = env.node_var();
        let node_var = env.node_var();
        let pattern = relationship_pattern(scope.var, &rel_var, rel, &node_var, target);
        let inner = self.build_connection(
            env,
            ConnectionScope {
                node: Scope::node(target, &node_var),
                edge: Some(Scope::edge(owner, &field.name, rel, &rel_var)),
                score: None,
            },
            value,
        )?;
        Ok(Some(quantify(env, op, &pattern, inner)))
    }

    #[allow(clippy::too_many_arguments)]
    fn relationship_predicate(
        &self,
        env: &mut Env,
        var: &str,
        owner: &Entity,
        field: &Field,
        rel: &Relationship,
        op: Operator,
        value: &Value,
    ) -> BuildResult {
        let target = self.target(rel)?;
        let node_var = env.node_var();
        let pattern = relationship_pattern(var, "", rel, &node_var, target);
        match op {
            Operator::Eq | Operator::Not if value.is_null() => {
                let exists = Predicate::exists(pattern, Predicate::True);
                Ok(if op == Operator::Eq {
                    exists.negate()
                } else {
                    exists
                })
            }
            Operator::Eq | Operator::All | Operator::Some | Operator::None | Operator::Single => {
                let inner = self.build(env, Scope::node(target, &node_var), value)?;
                let op = if op == Operator::Eq { Operator::Some } else { op };
                Ok(quantify(env, op, &pattern, inner))
            }
            other => Err(CompileError::InvalidOperator {
                field: format!("{}.{}", owner.name, field.name),
                operator: other.suffix().to_owned(),
            }),
        }
    }

    fn target(&self, rel: &Relationship) -> Result<&'a Entity, CompileError> {
        self.schema
            .entity(&rel.target)
            .ok_or_else(|| CompileError::UnknownEntity {
                entity: rel.target.clone(),
            })
    }
}

/// Recognizes `<rel>Connection_<QUANTIFIER>` keys.
fn split_connection_key(key: &str) -> Option<(&str, Operator)> {
    [
        ("Connection_SOME", Operator::Some),
        ("Connection_NONE", Operator::None),
        ("Connection_ALL", Operator::All),
        ("Connection_SINGLE", Operator::Single),
    ]
    .iter()
    .find_map(|(suffix, op)| key.strip_suffix(suffix).map(|prefix| (prefix, *op)))
}

/// Wraps a per-related-node predicate with the quantifier's semantics.
fn quantify(env: &mut Env, op: Operator, pattern: &str, inner: Predicate) -> Predicate {
    match op {
        Operator::None => Predicate::exists(pattern, inner).negate(),
        Operator::All => Predicate::and([
            Predicate::exists(pattern, inner.clone()),
            Predicate::exists(pattern, inner.negate()).negate(),
        ]),
        Operator::Single => {
            let var = env.value_var();
            let filter = inner.where_clause().replace('\n', " ");
            Predicate::expr(format!("single({var} IN [{pattern}{filter} | 1] WHERE true)"))
        }
        _ => Predicate::exists(pattern, inner),
    }
}

/// `score: { min, max }`, both bounds inclusive. A zero bound is a real
/// bound, never "no filter".
pub fn score_range(env: &mut Env, score: &str, value: &Value) -> BuildResult {
    let map = value
        .as_map()
        .ok_or_else(|| CompileError::expected_object("score", value))?;
    let mut parts = Vec::new();
    for (key, bound) in map {
        let op = match key.as_str() {
            "min" => ">=",
            "max" => "<=",
            other => {
                return Err(CompileError::InvalidOperator {
                    field: "score".to_owned(),
                    operator: other.to_owned(),
                })
            }
        };
        if bound.is_null() {
            continue;
        }
        let bound = coerce::coerce_scalar(ScalarType::Float, bound)?;
        let param = env.param(bound);
        parts.push(Predicate::expr(format!("{score} {op} {param}")));
    }
    Ok(Predicate::and(parts))
}

fn scalar_predicate(
    env: &mut Env,
    var: &str,
    field: &Field,
    ty: ScalarType,
    op: Operator,
    value: &Value,
) -> BuildResult {
    if let Some(base) = op.negated_base() {
        return Ok(scalar_predicate(env, var, field, ty, base, value)?.negate());
    }
    let target = property_access(var, field.property());
    let invalid = || CompileError::InvalidOperator {
        field: field.name.clone(),
        operator: op.suffix().to_owned(),
    };

    let rendered = match op {
        Operator::Eq if value.is_null() => format!("{target} IS NULL"),
        Operator::Eq => {
            let param = env.param(coerce::coerce_field(ty, field.list, value)?);
            format!("{target} = {param}")
        }
        Operator::In => {
            if field.list {
                return Err(invalid());
            }
            let param = env.param(coerce::coerce_list(ty, &field.name, value)?);
            format!("{target} IN {param}")
        }
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            if field.list || !ty.is_orderable() {
                return Err(invalid());
            }
            let symbol = match op {
                Operator::Lt => "<",
                Operator::Lte => "<=",
                Operator::Gt => ">",
                _ => ">=",
            };
            let param = env.param(coerce::coerce_scalar(ty, value)?);
            format!("{target} {symbol} {param}")
        }
        Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Matches => {
            if field.list || !ty.is_textual() {
                return Err(invalid());
            }
            let keyword = match op {
                Operator::Contains => "CONTAINS",
                Operator::StartsWith => "STARTS WITH",
                Operator::EndsWith => "ENDS WITH",
                _ => "=~",
            };
            let param = env.param(coerce::coerce_scalar(ScalarType::String, value)?);
            format!("{target} {keyword} {param}")
        }
        Operator::Includes => {
            if !field.list {
                return Err(invalid());
            }
            let param = env.param(coerce::coerce_scalar(ty, value)?);
            format!("{param} IN {target}")
        }
        _ => return Err(invalid()),
    };
    Ok(Predicate::Expr(rendered))
}

/// Substitutes values into a filter tree; used for claim placeholders.
pub fn map_leaves(
    filter: &Value,
    f: &mut impl FnMut(&Value) -> Option<Value>,
) -> Option<Value> {
    match filter {
        Value::Map(map) => {
            let mut out = BTreeMap::new();
            for (key, value) in map {
                out.insert(key.clone(), map_leaves(value, f)?);
            }
            Some(Value::Map(out))
        }
        Value::List(items) => items
            .iter()
            .map(|item| map_leaves(item, f))
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        leaf => f(leaf),
    }
}
