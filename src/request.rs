//! Structured requests accepted by the compiler.
//!
//! Requests are plain data and deserialize from JSON; field selections may
//! be written as bare strings (`"title"`) or as objects carrying an alias,
//! arguments and nested selections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::paginate::SortKey;
use crate::value::Value;

/// Ordered list of selected fields.
pub type Selection = Vec<FieldSelection>;

/// One requested operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Operation {
    /// List read.
    Read(ReadRequest),
    /// Relay connection read.
    Connection(ConnectionRequest),
    /// Aggregation over matching nodes.
    Aggregate(AggregateRequest),
    /// Full-text or vector search.
    Search(SearchRequest),
    /// Node creation.
    Create(CreateRequest),
    /// Node deletion.
    Delete(DeleteRequest),
}

impl Operation {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Read(_) => "read",
            Operation::Connection(_) => "connection",
            Operation::Aggregate(_) => "aggregate",
            Operation::Search(_) => "search",
            Operation::Create(_) => "create",
            Operation::Delete(_) => "delete",
        }
    }
}

/// Arguments accepted by list and connection fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Args {
    /// Filter input.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Sort keys, applied in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    /// List page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,
    /// List offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,
    /// Connection page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Value>,
    /// Connection cursor to resume after.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// A selected field.
///
/// Scalars and relationships are told apart by the schema. A field with a
/// `connection` selection reads a relationship connection; its name may
/// carry the `Connection` suffix (`actorsConnection`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "FieldSelectionDef")]
pub struct FieldSelection {
    /// Declared field name.
    pub name: String,
    /// Output key, defaults to `name`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Arguments for relationship fields.
    pub args: Args,
    /// Nested selection for relationship fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    /// Connection selection for relationship connections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionSelection>,
}

impl FieldSelection {
    /// Selects a scalar field.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            args: Args::default(),
            selection: None,
            connection: None,
        }
    }

    /// Selects a relationship with a nested selection.
    pub fn nested(name: impl Into<String>, selection: Selection) -> Self {
        Self {
            selection: Some(selection),
            ..Self::scalar(name)
        }
    }

    /// Selects a relationship connection.
    pub fn connection(name: impl Into<String>, connection: ConnectionSelection) -> Self {
        Self {
            connection: Some(connection),
            ..Self::scalar(name)
        }
    }

    /// Sets the output key.
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the field arguments.
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Key the value appears under in results.
    pub fn output_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldSelectionDef {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        args: Args,
        #[serde(default)]
        selection: Option<Selection>,
        #[serde(default)]
        connection: Option<ConnectionSelection>,
    },
}

impl From<FieldSelectionDef> for FieldSelection {
    fn from(def: FieldSelectionDef) -> Self {
        match def {
            FieldSelectionDef::Name(name) => FieldSelection::scalar(name),
            FieldSelectionDef::Full {
                name,
                alias,
                args,
                selection,
                connection,
            } => FieldSelection {
                name,
                alias,
                args,
                selection,
                connection,
            },
        }
    }
}

/// Selection over a connection (`totalCount`, `pageInfo`, `edges`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionSelection {
    /// Include `totalCount`.
    pub total_count: bool,
    /// Include `pageInfo`.
    pub page_info: bool,
    /// Edge selection; `None` omits `edges`.
    pub edges: Option<EdgeSelection>,
}

/// Selection within each edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSelection {
    /// Include the edge cursor.
    pub cursor: bool,
    /// Include the search score.
    pub score: bool,
    /// Node selection; `None` omits `node`.
    pub node: Option<Selection>,
    /// Relationship properties to include under `properties`.
    pub properties: Option<Vec<String>>,
}

/// List read of one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Entity name.
    pub entity: String,
    /// Filter, sort and window.
    #[serde(default, flatten)]
    pub args: Args,
    /// Projected fields.
    pub selection: Selection,
}

/// Connection read of one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Entity name.
    pub entity: String,
    /// Filter, sort and cursor window.
    #[serde(default, flatten)]
    pub args: Args,
    /// Projected connection.
    pub selection: ConnectionSelection,
}

/// Aggregation function over one field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    /// Numeric minimum.
    Min,
    /// Numeric maximum.
    Max,
    /// Numeric mean.
    Average,
    /// Numeric sum.
    Sum,
    /// Shortest string.
    Shortest,
    /// Longest string.
    Longest,
}

impl AggregateFunction {
    /// Output key of the function.
    pub fn key(self) -> &'static str {
        match self {
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Average => "average",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Shortest => "shortest",
            AggregateFunction::Longest => "longest",
        }
    }

    /// Whether the function applies to string fields.
    pub fn is_textual(self) -> bool {
        matches!(self, AggregateFunction::Shortest | AggregateFunction::Longest)
    }
}

/// Aggregations over one field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateField {
    /// Declared field name.
    pub name: String,
    /// Requested functions.
    pub functions: Vec<AggregateFunction>,
}

/// Aggregate request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Entity name.
    pub entity: String,
    /// Filter input.
    #[serde(default, rename = "where")]
    pub filter: Option<Value>,
    /// Include `count`.
    #[serde(default)]
    pub count: bool,
    /// Per-field aggregations.
    #[serde(default)]
    pub fields: Vec<AggregateField>,
}

/// Input for one search index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchQuery {
    /// Full-text phrase.
    Phrase {
        /// Lucene query string.
        phrase: String,
    },
    /// Query embedding.
    Vector {
        /// Embedding values.
        vector: Vec<f64>,
    },
}

/// Search request.
///
/// `indexes` maps an index name (or its query name) to its input; exactly
/// one entry is allowed per operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search inputs keyed by index or query name.
    pub indexes: BTreeMap<String, SearchQuery>,
    /// Connection filter (`node`, `score`), sort and cursor window.
    #[serde(default, flatten)]
    pub args: Args,
    /// Projected connection.
    pub selection: ConnectionSelection,
}

/// Create request; each input map becomes one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Entity name.
    pub entity: String,
    /// Field values per created node.
    pub input: Vec<BTreeMap<String, Value>>,
    /// Projected fields of the created nodes.
    #[serde(default)]
    pub selection: Selection,
}

/// Delete request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Entity name.
    pub entity: String,
    /// Filter input; `None` deletes every visible node.
    #[serde(default, rename = "where")]
    pub filter: Option<Value>,
}
