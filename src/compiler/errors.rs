#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Structured errors raised while compiling a request.
///
/// Every variant is detected before a statement reaches the executor, and
/// callers recover by correcting the request. Messages are stable; consumers
/// match several of them verbatim.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    /// Two search indexes invoked by one operation.
    #[error("Can only call one search at any given time")]
    MultipleSearches,
    /// A search operation named no index.
    #[error("search operation must name exactly one index")]
    NoSearch,
    /// Referenced entity is not declared.
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },
    /// Referenced field is not declared on the entity.
    #[error("unknown field '{field}' on '{entity}'")]
    UnknownField { entity: String, field: String },
    /// Referenced relationship property is not declared.
    #[error("unknown relationship property '{property}' on '{entity}.{field}'")]
    UnknownEdgeProperty {
        entity: String,
        field: String,
        property: String,
    },
    /// Referenced search index or query name is not declared.
    #[error("unknown search index '{index}'")]
    UnknownSearchIndex { index: String },
    /// Field used as a relationship is a scalar.
    #[error("field '{field}' on '{entity}' is not a relationship")]
    NotARelationship { entity: String, field: String },
    /// Relationship used where a scalar is expected.
    #[error("field '{field}' on '{entity}' is not a scalar")]
    NotAScalar { entity: String, field: String },
    /// Operator suffix does not apply to the field's type.
    #[error("operator '{operator}' cannot be applied to field '{field}'")]
    InvalidOperator { field: String, operator: String },
    /// Input value cannot be coerced to the expected scalar.
    #[error("{type_name} cannot represent {expectation}: {value}")]
    Coercion {
        type_name: &'static str,
        expectation: &'static str,
        value: Value,
    },
    /// A list was required.
    #[error("'{key}' expects a list (got {value})")]
    ExpectedList { key: String, value: Value },
    /// An object was required.
    #[error("'{key}' expects an object (got {value})")]
    ExpectedObject { key: String, value: Value },
    /// Score filter or sort used outside a search operation.
    #[error("score is only available in search operations")]
    ScoreOutsideSearch,
    /// Edge filter or sort used outside a connection.
    #[error("edge properties are only available in connection operations")]
    EdgeOutsideConnection,
    /// Limit, offset or `first` is negative or fractional.
    #[error("{argument} must be a non-negative integer (got {value})")]
    InvalidPagination { argument: &'static str, value: Value },
    /// Cursor could not be decoded.
    #[error("invalid cursor '{cursor}'")]
    InvalidCursor { cursor: String },
    /// Sort input is malformed.
    #[error("invalid sort: {reason}")]
    InvalidSort { reason: String },
    /// Search input does not match the index kind.
    #[error("{directive} index '{index}' requires a {expected} input")]
    SearchInputMismatch {
        directive: &'static str,
        index: String,
        expected: &'static str,
    },
    /// Query vector length differs from the index dimensionality.
    #[error("vector index '{index}' expects {expected} dimensions (got {actual})")]
    VectorDimensions {
        index: String,
        expected: u32,
        actual: usize,
    },
    /// Required field absent from create input.
    #[error("field '{field}' on '{entity}' is required")]
    MissingRequiredField { entity: String, field: String },
    /// Create invoked with no input.
    #[error("create requires at least one input")]
    EmptyCreate,
    /// Aggregate requested on a field that cannot aggregate.
    #[error("field '{field}' on '{entity}' cannot be aggregated")]
    InvalidAggregate { entity: String, field: String },
}

impl CompileError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MultipleSearches => "MultipleSearches",
            CompileError::NoSearch => "NoSearch",
            CompileError::UnknownEntity { .. } => "UnknownEntity",
            CompileError::UnknownField { .. } => "UnknownField",
            CompileError::UnknownEdgeProperty { .. } => "UnknownField",
            CompileError::UnknownSearchIndex { .. } => "UnknownSearchIndex",
            CompileError::NotARelationship { .. } => "TypeMismatch",
            CompileError::NotAScalar { .. } => "TypeMismatch",
            CompileError::InvalidOperator { .. } => "InvalidOperator",
            CompileError::Coercion { .. } => "Coercion",
            CompileError::ExpectedList { .. } => "TypeMismatch",
            CompileError::ExpectedObject { .. } => "TypeMismatch",
            CompileError::ScoreOutsideSearch => "ScoreOutsideSearch",
            CompileError::EdgeOutsideConnection => "EdgeOutsideConnection",
            CompileError::InvalidPagination { .. } => "InvalidPagination",
            CompileError::InvalidCursor { .. } => "InvalidCursor",
            CompileError::InvalidSort { .. } => "InvalidSort",
            CompileError::SearchInputMismatch { .. } => "SearchInputMismatch",
            CompileError::VectorDimensions { .. } => "VectorDimensions",
            CompileError::MissingRequiredField { .. } => "MissingRequiredField",
            CompileError::EmptyCreate => "EmptyCreate",
            CompileError::InvalidAggregate { .. } => "InvalidAggregate",
        }
    }

    pub(crate) fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        CompileError::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub(crate) fn expected_object(key: impl Into<String>, value: &Value) -> Self {
        CompileError::ExpectedObject {
            key: key.into(),
            value: value.clone(),
        }
    }

    pub(crate) fn expected_list(key: impl Into<String>, value: &Value) -> Self {
        CompileError::ExpectedList {
            key: key.into(),
            value: value.clone(),
        }
    }
}

/// Convenience wrapper that formats compile errors with their codes.
pub struct CompileErrorWithCode<'a>(pub &'a CompileError);

impl fmt::Display for CompileErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
