//! Compile-time evaluation of rule conditions over the caller's claims.

use std::cmp::Ordering;

use crate::compiler::CompileError;
use crate::context::Claims;
use crate::filter::operator::{split_suffix, Operator};
use crate::value::Value;

/// Evaluates a claims filter (`{ roles_INCLUDES: "admin", AND: [...] }`).
///
/// Missing claims compare as null, so a condition on an absent claim only
/// holds when it explicitly asks for null.
pub fn evaluate(filter: &Value, claims: Option<&Claims>) -> Result<bool, CompileError> {
    let map = filter
        .as_map()
        .ok_or_else(|| CompileError::expected_object("jwt", filter))?;
    for (key, expected) in map {
        let holds = match key.as_str() {
            "AND" => all(expected, claims, key)?,
            "OR" => any(expected, claims, key)?,
            "NOT" => !evaluate(expected, claims)?,
            _ => {
                let exact = claims.and_then(|c| c.get(key)).is_some();
                let (path, op) = if exact {
                    (key.as_str(), Operator::Eq)
                } else {
                    split_suffix(key)
                };
                let actual = claims.and_then(|c| c.get(path)).unwrap_or(&Value::Null);
                compare(path, op, actual, expected)?
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all(items: &Value, claims: Option<&Claims>, key: &str) -> Result<bool, CompileError> {
    let items = items
        .as_list()
        .ok_or_else(|| CompileError::expected_list(key, items))?;
    for item in items {
        if !evaluate(item, claims)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any(items: &Value, claims: Option<&Claims>, key: &str) -> Result<bool, CompileError> {
    let items = items
        .as_list()
        .ok_or_else(|| CompileError::expected_list(key, items))?;
    for item in items {
        if evaluate(item, claims)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn compare(path: &str, op: Operator, actual: &Value, expected: &Value) -> Result<bool, CompileError> {
    if let Some(base) = op.negated_base() {
        return Ok(!compare(path, base, actual, expected)?);
    }
    let invalid = || CompileError::InvalidOperator {
        field: format!("jwt.{path}"),
        operator: op.suffix().to_owned(),
    };
    Ok(match op {
        Operator::Eq => values_equal(actual, expected),
        Operator::In => expected
            .as_list()
            .ok_or_else(|| CompileError::expected_list(path, expected))?
            .iter()
            .any(|item| values_equal(actual, item)),
        Operator::Includes => actual
            .as_list()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, expected))),
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            match order(actual, expected) {
                Some(ord) => match op {
                    Operator::Lt => ord == Ordering::Less,
                    Operator::Lte => ord != Ordering::Greater,
                    Operator::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                },
                None => false,
            }
        }
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            match (actual.as_str(), expected.as_str()) {
                (Some(actual), Some(expected)) => match op {
                    Operator::Contains => actual.contains(expected),
                    Operator::StartsWith => actual.starts_with(expected),
                    _ => actual.ends_with(expected),
                },
                _ => false,
            }
        }
        _ => return Err(invalid()),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}
