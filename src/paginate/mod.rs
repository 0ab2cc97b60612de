//! Sort and window planning.
//!
//! Sort keys resolve to stored-property expressions (or the internal score
//! variable) and render in exactly the order given; ties are broken by the
//! next key, never reordered. Windows come either from `limit`/`offset` or
//! from a Relay cursor pair and are validated before anything is emitted.

pub mod cursor;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compiler::{CompileError, CompilerOptions};
use crate::cypher::{property_access, Env};
use crate::schema::{Entity, Relationship};
use crate::value::Value;

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    fn parse(value: &Value) -> Result<Self, CompileError> {
        match value.as_str() {
            Some("ASC") => Ok(SortDirection::Asc),
            Some("DESC") => Ok(SortDirection::Desc),
            _ => Err(CompileError::InvalidSort {
                reason: format!("direction must be ASC or DESC (got {value})"),
            }),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        })
    }
}

/// What a sort key orders by.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum SortTarget {
    /// Declared field of the node being sorted.
    Field(String),
    /// Relationship property, connections only.
    Edge(String),
    /// Search relevance score.
    Score,
}

/// One sort key. Parsed from `{title: ASC}`, `{node: {title: ASC}}`,
/// `{edge: {role: DESC}}` or `{score: DESC}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct SortKey {
    /// Ordered value.
    pub target: SortTarget,
    /// Direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending/descending key on a node field.
    pub fn field(name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            target: SortTarget::Field(name.into()),
            direction,
        }
    }

    /// Key on the search score.
    pub fn score(direction: SortDirection) -> Self {
        Self {
            target: SortTarget::Score,
            direction,
        }
    }
}

fn single_entry(value: &Value) -> Result<(&str, &Value), CompileError> {
    let map = value
        .as_map()
        .ok_or_else(|| CompileError::expected_object("sort", value))?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((key, inner)), None) => Ok((key.as_str(), inner)),
        _ => Err(CompileError::InvalidSort {
            reason: format!("each sort object needs exactly one key (got {value})"),
        }),
    }
}

impl TryFrom<Value> for SortKey {
    type Error = CompileError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let (key, inner) = single_entry(&value)?;
        let wrapped = matches!(key, "node" | "edge") && inner.as_map().is_some();
        if wrapped {
            let (name, direction) = single_entry(inner)?;
            let direction = SortDirection::parse(direction)?;
            let target = if key == "node" {
                SortTarget::Field(name.to_owned())
            } else {
                SortTarget::Edge(name.to_owned())
            };
            return Ok(Self { target, direction });
        }
        let direction = SortDirection::parse(inner)?;
        let target = if key == "score" {
            SortTarget::Score
        } else {
            SortTarget::Field(key.to_owned())
        };
        Ok(Self { target, direction })
    }
}

/// Relationship variable in reach of edge sort keys.
#[derive(Clone, Copy, Debug)]
pub struct EdgeScope<'a> {
    /// Entity declaring the relationship.
    pub owner: &'a Entity,
    /// Declared relationship field.
    pub field: &'a str,
    /// Relationship definition.
    pub rel: &'a Relationship,
    /// Relationship variable.
    pub var: &'a str,
}

/// Variables sort keys may refer to.
#[derive(Clone, Copy, Debug)]
pub struct SortScope<'a> {
    /// Sorted entity.
    pub entity: &'a Entity,
    /// Node variable.
    pub node: &'a str,
    /// Relationship variable, connections only.
    pub edge: Option<EdgeScope<'a>>,
    /// Internal score variable, search operations only.
    pub score: Option<&'a str>,
}

/// Resolved `ORDER BY` item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderItem {
    /// Ordered expression.
    pub expr: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Resolves sort keys against `scope`, preserving their order.
pub fn resolve_order(scope: &SortScope<'_>, keys: &[SortKey]) -> Result<Vec<OrderItem>, CompileError> {
    keys.iter()
        .map(|key| {
            let expr = match &key.target {
                SortTarget::Score => match scope.score {
                    Some(score) => score.to_owned(),
                    // A plain field that happens to be called `score`.
                    None if scope.entity.field("score").is_some() => {
                        field_expr(scope.entity, scope.node, "score")?
                    }
                    None => return Err(CompileError::ScoreOutsideSearch),
                },
                SortTarget::Field(name) => field_expr(scope.entity, scope.node, name)?,
                SortTarget::Edge(name) => {
                    let edge = scope.edge.ok_or(CompileError::EdgeOutsideConnection)?;
                    let property = edge.rel.property(name).ok_or_else(|| {
                        CompileError::UnknownEdgeProperty {
                            entity: edge.owner.name.clone(),
                            field: edge.field.to_owned(),
                            property: name.clone(),
                        }
                    })?;
                    property_access(edge.var, property.property())
                }
            };
            Ok(OrderItem {
                expr,
                direction: key.direction,
            })
        })
        .collect()
}

fn field_expr(entity: &Entity, var: &str, name: &str) -> Result<String, CompileError> {
    let field = entity
        .field(name)
        .ok_or_else(|| CompileError::unknown_field(&entity.name, name))?;
    match field.scalar_type() {
        Some(ty) if ty.is_orderable() && !field.list => Ok(property_access(var, field.property())),
        _ => Err(CompileError::InvalidSort {
            reason: format!("field '{name}' on '{}' is not sortable", entity.name),
        }),
    }
}

/// Validates a limit/offset/first argument. `null` means "not given".
pub fn non_negative(argument: &'static str, value: &Value) -> Result<Option<u64>, CompileError> {
    let invalid = || CompileError::InvalidPagination {
        argument,
        value: value.clone(),
    };
    match value {
        Value::Null => Ok(None),
        Value::Int(v) => u64::try_from(*v).map(Some).map_err(|_| invalid()),
        Value::Float(v) if v.is_finite() && v.fract() == 0.0 && *v >= 0.0 => Ok(Some(*v as u64)),
        _ => Err(invalid()),
    }
}

/// Page-size defaults and caps for one entity.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PagePolicy {
    /// Page size used when the request names none.
    pub default: Option<u64>,
    /// Upper bound on any page size.
    pub max: Option<u64>,
}

impl PagePolicy {
    /// Entity limits first, then the global fallbacks.
    pub fn for_entity(entity: &Entity, options: &CompilerOptions) -> Self {
        let declared = entity.limit.unwrap_or_default();
        Self {
            default: declared.default.or(options.default_limit),
            max: declared.max.or(options.max_limit),
        }
    }

    /// Effective page size for a request.
    pub fn resolve(&self, requested: Option<u64>) -> Option<u64> {
        match (requested.or(self.default), self.max) {
            (Some(size), Some(max)) => Some(size.min(max)),
            (None, Some(max)) => Some(max),
            (size, None) => size,
        }
    }
}

/// Row window applied after ordering.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Window {
    /// Rows skipped.
    pub offset: u64,
    /// Rows kept, unbounded when `None`.
    pub limit: Option<u64>,
}

impl Window {
    /// Window from `offset`/`limit` arguments.
    pub fn from_offset_limit(
        offset: Option<&Value>,
        limit: Option<&Value>,
        policy: PagePolicy,
    ) -> Result<Self, CompileError> {
        let offset = match offset {
            Some(value) => non_negative("offset", value)?.unwrap_or(0),
            None => 0,
        };
        let limit = match limit {
            Some(value) => non_negative("limit", value)?,
            None => None,
        };
        Ok(Self {
            offset,
            limit: policy.resolve(limit),
        })
    }

    /// Window from Relay `first`/`after` arguments.
    pub fn from_cursor(
        after: Option<&str>,
        first: Option<&Value>,
        policy: PagePolicy,
    ) -> Result<Self, CompileError> {
        let offset = cursor::start_after(after)?;
        let first = match first {
            Some(value) => non_negative("first", value)?,
            None => None,
        };
        Ok(Self {
            offset,
            limit: policy.resolve(first),
        })
    }

    /// Whether the window restricts anything.
    pub fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }
}

fn int_param(env: &mut Env, value: u64) -> String {
    env.param(Value::Int(i64::try_from(value).unwrap_or(i64::MAX)))
}

/// Renders `WITH * ORDER BY ... SKIP ... LIMIT ...`, or nothing when neither
/// ordering nor windowing applies.
pub fn order_and_window(env: &mut Env, order: &[OrderItem], window: Window) -> Option<String> {
    if order.is_empty() && window.is_unbounded() {
        return None;
    }
    let mut lines = vec!["WITH *".to_owned()];
    if !order.is_empty() {
        let items: Vec<String> = order
            .iter()
            .map(|item| format!("{} {}", item.expr, item.direction))
            .collect();
        lines.push(format!("ORDER BY {}", items.join(", ")));
    }
    if window.offset > 0 {
        lines.push(format!("SKIP {}", int_param(env, window.offset)));
    }
    if let Some(limit) = window.limit {
        lines.push(format!("LIMIT {}", int_param(env, limit)));
    }
    Some(lines.join("\n"))
}
