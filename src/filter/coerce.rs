//! Input coercion against declared scalar types.
//!
//! Failures quote the offending value verbatim, mirroring GraphQL input
//! coercion messages.

use crate::compiler::CompileError;
use crate::schema::ScalarType;
use crate::value::Value;

fn reject(ty: ScalarType, expectation: &'static str, value: &Value) -> CompileError {
    CompileError::Coercion {
        type_name: ty.name(),
        expectation,
        value: value.clone(),
    }
}

/// Coerces a single non-null value to `ty`.
pub fn coerce_scalar(ty: ScalarType, value: &Value) -> Result<Value, CompileError> {
    match ty {
        ScalarType::Id => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Int(v) => Ok(Value::String(v.to_string())),
            _ => Err(reject(ty, "value", value)),
        },
        ScalarType::String
        | ScalarType::DateTime
        | ScalarType::Date
        | ScalarType::Time
        | ScalarType::Duration => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(reject(ty, "a non string value", value)),
        },
        ScalarType::Int => match value {
            Value::Int(v) if i32::try_from(*v).is_ok() => Ok(value.clone()),
            Value::Int(_) => Err(reject(ty, "non 32-bit signed integer value", value)),
            Value::Float(v) if v.fract() == 0.0 && *v >= i32::MIN as f64 && *v <= i32::MAX as f64 => {
                Ok(Value::Int(*v as i64))
            }
            _ => Err(reject(ty, "non-integer value", value)),
        },
        ScalarType::BigInt => match value {
            Value::Int(_) => Ok(value.clone()),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| reject(ty, "non-integer value", value)),
            _ => Err(reject(ty, "non-integer value", value)),
        },
        ScalarType::Float => match value {
            Value::Int(v) => Ok(Value::Float(*v as f64)),
            Value::Float(v) if v.is_finite() => Ok(value.clone()),
            _ => Err(reject(ty, "non numeric value", value)),
        },
        ScalarType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(reject(ty, "a non boolean value", value)),
        },
        ScalarType::Point => match value {
            Value::Map(_) => Ok(value.clone()),
            _ => Err(reject(ty, "a non object value", value)),
        },
    }
}

/// Coerces a value destined for a field; list fields accept a single item
/// and wrap it.
pub fn coerce_field(ty: ScalarType, list: bool, value: &Value) -> Result<Value, CompileError> {
    if !list {
        return coerce_scalar(ty, value);
    }
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| coerce_scalar(ty, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        single => Ok(Value::List(vec![coerce_scalar(ty, single)?])),
    }
}

/// Coerces every element of a list operand.
pub fn coerce_list(ty: ScalarType, key: &str, value: &Value) -> Result<Value, CompileError> {
    let items = value
        .as_list()
        .ok_or_else(|| CompileError::expected_list(key, value))?;
    items
        .iter()
        .map(|item| coerce_scalar(ty, item))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}
