//! Boundary to the driver that runs statements.
//!
//! The crate never talks to a database directly. An [`Executor`] runs a
//! statement with parameters against an optional named database and returns
//! rows; catalogue inspection and object creation have default
//! implementations in terms of [`Executor::run`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::auth::FORBIDDEN_MARKER;
use crate::compiler::CompiledStatement;
use crate::context::RequestContext;
use crate::reconcile::{RequiredConstraint, RequiredIndex};
use crate::value::{Params, Value};
use crate::{Error, Result};

/// One returned record, keyed by column.
pub type Row = BTreeMap<String, Value>;

/// Store error code raised on uniqueness violations.
pub const CONSTRAINT_VIOLATION_CODE: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

/// Failure reported by the driver, surfaced unmodified.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutorError {
    /// Store status code, when the driver reports one.
    pub code: Option<String>,
    /// Store message.
    pub message: String,
}

impl ExecutorError {
    /// Error without a status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Error carrying a status code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Catalogue listing selector.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CatalogueKind {
    /// `SHOW INDEXES`.
    Index,
    /// `SHOW CONSTRAINTS`.
    Constraint,
}

impl CatalogueKind {
    /// Listing statement.
    pub fn statement(self) -> &'static str {
        match self {
            CatalogueKind::Index => {
                "SHOW INDEXES YIELD name, type, entityType, labelsOrTypes, properties"
            }
            CatalogueKind::Constraint => {
                "SHOW CONSTRAINTS YIELD name, type, entityType, labelsOrTypes, properties"
            }
        }
    }
}

/// One live index or constraint.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CatalogueEntry {
    /// Object name.
    pub name: String,
    /// Store type (`FULLTEXT`, `VECTOR`, `UNIQUENESS`, ...).
    pub object_type: String,
    /// `NODE` or `RELATIONSHIP`.
    pub entity_type: String,
    /// Labels (or relationship types) the object covers.
    pub labels_or_types: Vec<String>,
    /// Covered properties.
    pub properties: Vec<String>,
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

impl CatalogueEntry {
    /// Parses a listing row; rows without a name are skipped.
    pub fn from_row(row: &Row) -> Option<Self> {
        let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_owned);
        Some(Self {
            name: text("name")?,
            object_type: text("type").unwrap_or_default(),
            entity_type: text("entityType").unwrap_or_default(),
            labels_or_types: strings(row.get("labelsOrTypes")),
            properties: strings(row.get("properties")),
        })
    }

    /// Whether the object covers nodes.
    pub fn is_node(&self) -> bool {
        self.entity_type.is_empty() || self.entity_type == "NODE"
    }

    /// Whether the constraint rejects duplicate values. Node keys imply
    /// uniqueness; existence and type constraints do not.
    pub fn enforces_uniqueness(&self) -> bool {
        matches!(
            self.object_type.as_str(),
            "UNIQUENESS" | "NODE_PROPERTY_UNIQUENESS" | "NODE_KEY"
        )
    }
}

/// Statement runner supplied by the embedding application.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs `statement` with `params`; `database` of `None` uses the default.
    async fn run(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> std::result::Result<Vec<Row>, ExecutorError>;

    /// Lists live indexes or constraints.
    async fn inspect_catalogue(
        &self,
        kind: CatalogueKind,
        database: Option<&str>,
    ) -> std::result::Result<Vec<CatalogueEntry>, ExecutorError> {
        let rows = self.run(kind.statement(), &Params::new(), database).await?;
        Ok(rows.iter().filter_map(CatalogueEntry::from_row).collect())
    }

    /// Creates a search index.
    async fn create_index(
        &self,
        index: &RequiredIndex,
        database: Option<&str>,
    ) -> std::result::Result<(), ExecutorError> {
        self.run(&index.create_statement(), &Params::new(), database)
            .await
            .map(|_| ())
    }

    /// Creates a uniqueness constraint.
    async fn create_constraint(
        &self,
        constraint: &RequiredConstraint,
        database: Option<&str>,
    ) -> std::result::Result<(), ExecutorError> {
        self.run(&constraint.create_statement(), &Params::new(), database)
            .await
            .map(|_| ())
    }
}

/// Maps store failures with a stable meaning to crate errors.
pub fn translate_error(err: ExecutorError) -> Error {
    if err.code.as_deref() == Some(CONSTRAINT_VIOLATION_CODE) {
        debug!(message = %err.message, "constraint violation");
        return Error::ConstraintValidationFailed;
    }
    if err.message.contains(FORBIDDEN_MARKER) {
        debug!("validation check failed in statement");
        return Error::Forbidden;
    }
    Error::Executor(err)
}

/// Runs a compiled statement and shapes every returned `this` value.
pub async fn execute<E>(
    executor: &E,
    compiled: &CompiledStatement,
    ctx: &RequestContext,
) -> Result<Vec<Value>>
where
    E: Executor + ?Sized,
{
    let rows = executor
        .run(&compiled.cypher, &compiled.params, ctx.database())
        .await
        .map_err(translate_error)?;
    Ok(rows
        .into_iter()
        .map(|mut row| {
            let mut value = row.remove("this").unwrap_or_default();
            compiled.shape.apply(&mut value);
            value
        })
        .collect())
}
