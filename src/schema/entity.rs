//! Entity, field, and relationship definitions.

use serde::{Deserialize, Serialize};

use super::auth::AuthorizationRules;
use super::index::{SearchIndexSpec, UniquenessSpec};
use crate::cypher::escape_name;

/// Scalar types understood by the input coercion layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Opaque identifier, accepts strings and integers.
    #[serde(rename = "ID")]
    Id,
    /// UTF-8 string.
    String,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// Double precision float.
    Float,
    /// Boolean.
    Boolean,
    /// ISO-8601 date time, passed through as a string.
    DateTime,
    /// ISO-8601 date.
    Date,
    /// ISO-8601 time.
    Time,
    /// ISO-8601 duration.
    Duration,
    /// Spatial point map.
    Point,
}

impl ScalarType {
    /// Name used in coercion error messages.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Id => "ID",
            ScalarType::String => "String",
            ScalarType::Int => "Int",
            ScalarType::BigInt => "BigInt",
            ScalarType::Float => "Float",
            ScalarType::Boolean => "Boolean",
            ScalarType::DateTime => "DateTime",
            ScalarType::Date => "Date",
            ScalarType::Time => "Time",
            ScalarType::Duration => "Duration",
            ScalarType::Point => "Point",
        }
    }

    /// Whether ordering comparisons make sense for this type.
    pub fn is_orderable(self) -> bool {
        !matches!(self, ScalarType::Boolean | ScalarType::Point)
    }

    /// Whether string operators (`CONTAINS`, `STARTS_WITH`, ...) apply.
    pub fn is_textual(self) -> bool {
        matches!(self, ScalarType::Id | ScalarType::String)
    }

    /// Whether the type aggregates numerically (min/max/average/sum).
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::BigInt | ScalarType::Float)
    }
}

/// Direction selector for relationship traversals, seen from the owning entity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// `(owner)-[:TYPE]->(target)`.
    #[default]
    Out,
    /// `(owner)<-[:TYPE]-(target)`.
    In,
    /// Undirected, `(owner)-[:TYPE]-(target)`.
    #[serde(alias = "UNDIRECTED")]
    Both,
}

/// Relationship edge declared on an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship type label.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Traversal direction from the owning entity.
    #[serde(default)]
    pub direction: Direction,
    /// Name of the entity at the far end.
    pub target: String,
    /// Properties stored on the relationship itself.
    #[serde(default)]
    pub properties: Vec<Field>,
}

impl Relationship {
    /// Looks up a relationship property by declared name.
    pub fn property(&self, name: &str) -> Option<&Field> {
        self.properties.iter().find(|f| f.name == name)
    }
}

/// What a field holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Stored scalar property.
    Scalar(ScalarType),
    /// Traversal to another entity.
    Relationship(Relationship),
}

fn default_true() -> bool {
    true
}

/// A declared field of an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Declared (API-facing) name.
    pub name: String,
    /// Stored property name override.
    #[serde(default)]
    pub alias: Option<String>,
    /// Scalar or relationship payload.
    pub kind: FieldKind,
    /// Whether the field holds a list.
    #[serde(default)]
    pub list: bool,
    /// Whether null is an acceptable value.
    #[serde(default = "default_true")]
    pub nullable: bool,
}

impl Field {
    /// Scalar field constructor.
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind: FieldKind::Scalar(ty),
            list: false,
            nullable: true,
        }
    }

    /// Relationship field constructor; relationship lists are the common case.
    pub fn relationship(
        name: impl Into<String>,
        rel_type: impl Into<String>,
        direction: Direction,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind: FieldKind::Relationship(Relationship {
                rel_type: rel_type.into(),
                direction,
                target: target.into(),
                properties: Vec::new(),
            }),
            list: true,
            nullable: true,
        }
    }

    /// Sets the stored property name.
    pub fn aliased(mut self, property: impl Into<String>) -> Self {
        self.alias = Some(property.into());
        self
    }

    /// Marks the field as a list.
    pub fn list(mut self, list: bool) -> Self {
        self.list = list;
        self
    }

    /// Marks the field as non-nullable.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Attaches relationship properties; no-op for scalar fields.
    pub fn with_edge_properties(mut self, properties: Vec<Field>) -> Self {
        if let FieldKind::Relationship(rel) = &mut self.kind {
            rel.properties = properties;
        }
        self
    }

    /// Stored property name; the declared name never reaches a statement.
    pub fn property(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Scalar type, if this is a scalar field.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match &self.kind {
            FieldKind::Scalar(ty) => Some(*ty),
            FieldKind::Relationship(_) => None,
        }
    }

    /// Relationship payload, if this is a relationship field.
    pub fn relationship_def(&self) -> Option<&Relationship> {
        match &self.kind {
            FieldKind::Relationship(rel) => Some(rel),
            FieldKind::Scalar(_) => None,
        }
    }
}

/// Page size defaults and caps declared on an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSpec {
    /// Page size applied when the caller supplies none.
    #[serde(default)]
    pub default: Option<u64>,
    /// Upper bound applied to every page size.
    #[serde(default)]
    pub max: Option<u64>,
}

/// One declared node type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical entity name.
    pub name: String,
    /// Labels; the first is primary. Defaults to the entity name.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Ordered field list.
    pub fields: Vec<Field>,
    /// Declared full-text and vector indexes.
    #[serde(default)]
    pub search_indexes: Vec<SearchIndexSpec>,
    /// Declared uniqueness requirements.
    #[serde(default)]
    pub uniqueness: Vec<UniquenessSpec>,
    /// Authorization rules.
    #[serde(default)]
    pub authorization: AuthorizationRules,
    /// Page size defaults and caps.
    #[serde(default)]
    pub limit: Option<LimitSpec>,
}

impl Entity {
    /// Creates an entity with no fields whose only label is its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            labels: vec![name.clone()],
            name,
            fields: Vec::new(),
            search_indexes: Vec::new(),
            uniqueness: Vec::new(),
            authorization: AuthorizationRules::default(),
            limit: None,
        }
    }

    /// Replaces the label list.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a search index declaration.
    pub fn with_search_index(mut self, spec: SearchIndexSpec) -> Self {
        self.search_indexes.push(spec);
        self
    }

    /// Appends a uniqueness declaration.
    pub fn with_uniqueness(mut self, spec: UniquenessSpec) -> Self {
        self.uniqueness.push(spec);
        self
    }

    /// Replaces the authorization rules.
    pub fn with_authorization(mut self, rules: AuthorizationRules) -> Self {
        self.authorization = rules;
        self
    }

    /// Sets the page size limits.
    pub fn with_limit(mut self, limit: LimitSpec) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Primary label.
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.name)
    }

    /// Labels after the primary one.
    pub fn additional_labels(&self) -> &[String] {
        self.labels.get(1..).unwrap_or_default()
    }

    /// Label suffix for node patterns, e.g. `:Movie:Film`.
    pub fn label_pattern(&self) -> String {
        self.labels
            .iter()
            .map(|label| format!(":{}", escape_name(label)))
            .collect()
    }

    /// Looks up a field by declared name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolves a declared field name to its stored property.
    pub fn property_of(&self, name: &str) -> Option<&str> {
        self.field(name).map(Field::property)
    }

    /// Scalar fields in declaration order.
    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.scalar_type().is_some())
    }
}
