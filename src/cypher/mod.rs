//! Statement building blocks: identifier escaping, request-scoped naming,
//! parameter binding, and traversal patterns.

pub mod predicate;

pub use predicate::Predicate;

use crate::schema::{Direction, Entity, Relationship};
use crate::value::{Params, Value};

/// Escapes a label, relationship type, or property name for interpolation.
///
/// Plain identifiers pass through; anything else is backtick-quoted with
/// embedded backticks doubled.
pub fn escape_name(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if plain {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// `var.property` with the property escaped.
pub fn property_access(var: &str, property: &str) -> String {
    format!("{var}.{}", escape_name(property))
}

/// Request-scoped variable and parameter allocator.
///
/// Every name handed out is unique for the lifetime of one compilation, so
/// sibling subtrees never collide on a variable or a parameter.
#[derive(Debug, Default)]
pub struct Env {
    next_var: usize,
    next_param: usize,
    params: Params,
}

impl Env {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh node/relationship variable (`this0`, `this1`, ...).
    pub fn node_var(&mut self) -> String {
        let idx = self.next_var;
        self.next_var += 1;
        format!("this{idx}")
    }

    /// Allocates a fresh value variable (`var0`, `var1`, ...).
    pub fn value_var(&mut self) -> String {
        let idx = self.next_var;
        self.next_var += 1;
        format!("var{idx}")
    }

    /// Binds a value and returns its placeholder (`$param0`).
    pub fn param(&mut self, value: impl Into<Value>) -> String {
        let name = format!("param{}", self.next_param);
        self.next_param += 1;
        self.params.insert(name.clone(), value.into());
        format!("${name}")
    }

    /// Number of parameters bound so far.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Consumes the environment, yielding the bound parameters.
    pub fn into_params(self) -> Params {
        self.params
    }
}

/// Renders `(from)-[rel_var:TYPE]->(to:Labels)` honoring the declared direction.
///
/// `rel_var` may be empty for anonymous relationships.
pub fn relationship_pattern(
    from: &str,
    rel_var: &str,
    rel: &Relationship,
    to: &str,
    target: &Entity,
) -> String {
    let edge = format!("[{rel_var}:{}]", escape_name(&rel.rel_type));
    let to = format!("({to}{})", target.label_pattern());
    match rel.direction {
        Direction::Out => format!("({from})-{edge}->{to}"),
        Direction::In => format!("({from})<-{edge}-{to}"),
        Direction::Both => format!("({from})-{edge}-{to}"),
    }
}

/// Indents every line of `body` by four spaces.
pub fn indent(body: &str) -> String {
    body.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wraps `body` in a `CALL { ... }` subquery importing `imports`.
pub fn call_subquery(imports: &[&str], body: &str) -> String {
    let mut inner = String::new();
    if !imports.is_empty() {
        inner.push_str("WITH ");
        inner.push_str(&imports.join(", "));
        inner.push('\n');
    }
    inner.push_str(body);
    format!("CALL {{\n{}\n}}", indent(&inner))
}
