//! Objects the schema requires in the live catalogue, and how to create them.

use crate::cypher::escape_name;
use crate::schema::{Schema, SearchIndexSpec, SearchKind, Similarity, UniquenessKind};

/// Declared field covered by an index, with its stored property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexField {
    /// Declared field name.
    pub field: String,
    /// Stored property name.
    pub property: String,
}

impl IndexField {
    /// Whether the declared name differs from the stored property.
    pub fn is_aliased(&self) -> bool {
        self.field != self.property
    }
}

/// Vector index configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VectorConfig {
    /// Embedding dimensionality.
    pub dimensions: u32,
    /// Similarity function.
    pub similarity: Similarity,
}

/// A search index the schema requires.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequiredIndex {
    /// Owning entity.
    pub entity: String,
    /// Index name.
    pub name: String,
    /// Full-text or vector.
    pub kind: SearchKind,
    /// Entity labels, primary first.
    pub labels: Vec<String>,
    /// Covered fields in declaration order.
    pub fields: Vec<IndexField>,
    /// Vector settings, vector indexes only.
    pub vector: Option<VectorConfig>,
}

impl RequiredIndex {
    /// Label the index is created on.
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.entity)
    }

    /// Idempotent creation statement.
    pub fn create_statement(&self) -> String {
        let name = escape_name(&self.name);
        let label = escape_name(self.primary_label());
        match (self.kind, self.vector) {
            (SearchKind::Vector, Some(config)) => {
                let property = self
                    .fields
                    .first()
                    .map(|f| escape_name(&f.property))
                    .unwrap_or_default();
                format!(
                    "CREATE VECTOR INDEX {name} IF NOT EXISTS FOR (n:{label}) ON n.{property} \
                     OPTIONS {{indexConfig: {{`vector.dimensions`: {}, `vector.similarity_function`: '{}'}}}}",
                    config.dimensions,
                    config.similarity.as_str()
                )
            }
            _ => {
                let properties: Vec<String> = self
                    .fields
                    .iter()
                    .map(|f| format!("n.{}", escape_name(&f.property)))
                    .collect();
                format!(
                    "CREATE FULLTEXT INDEX {name} IF NOT EXISTS FOR (n:{label}) ON EACH [{}]",
                    properties.join(", ")
                )
            }
        }
    }
}

/// A uniqueness constraint the schema requires.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequiredConstraint {
    /// Owning entity.
    pub entity: String,
    /// Constraint name.
    pub name: String,
    /// Entity labels, primary first. A constraint on any of them satisfies
    /// the requirement; creation targets the primary label.
    pub labels: Vec<String>,
    /// Declared field name.
    pub field: String,
    /// Stored property name.
    pub property: String,
    /// Origin of the requirement.
    pub kind: UniquenessKind,
}

impl RequiredConstraint {
    /// Label the constraint is created on.
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(&self.entity)
    }

    /// Idempotent creation statement.
    pub fn create_statement(&self) -> String {
        format!(
            "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
            escape_name(&self.name),
            escape_name(self.primary_label()),
            escape_name(&self.property)
        )
    }
}

/// Anything reconciliation may need to create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RequiredObject {
    /// Search index.
    Index(RequiredIndex),
    /// Uniqueness constraint.
    Constraint(RequiredConstraint),
}

impl RequiredObject {
    /// Idempotent creation statement.
    pub fn create_statement(&self) -> String {
        match self {
            RequiredObject::Index(index) => index.create_statement(),
            RequiredObject::Constraint(constraint) => constraint.create_statement(),
        }
    }
}

/// Every index and constraint the schema declares, entity by entity.
pub fn required_objects(schema: &Schema) -> Vec<RequiredObject> {
    let mut objects = Vec::new();
    for entity in schema.entities() {
        for spec in &entity.search_indexes {
            let fields = spec
                .fields()
                .into_iter()
                .map(|field| IndexField {
                    field: field.to_owned(),
                    property: entity.property_of(field).unwrap_or(field).to_owned(),
                })
                .collect();
            let vector = match spec {
                SearchIndexSpec::Vector(vector) => Some(VectorConfig {
                    dimensions: vector.dimensions,
                    similarity: vector.similarity,
                }),
                SearchIndexSpec::Fulltext(_) => None,
            };
            objects.push(RequiredObject::Index(RequiredIndex {
                entity: entity.name.clone(),
                name: spec.name().to_owned(),
                kind: spec.kind(),
                labels: entity.labels.clone(),
                fields,
                vector,
            }));
        }
        for unique in &entity.uniqueness {
            let property = entity.property_of(&unique.field).unwrap_or(&unique.field);
            objects.push(RequiredObject::Constraint(RequiredConstraint {
                entity: entity.name.clone(),
                name: unique.constraint_name_for(entity.primary_label(), property),
                labels: entity.labels.clone(),
                field: unique.field.clone(),
                property: property.to_owned(),
                kind: unique.kind,
            }));
        }
    }
    objects
}
