//! Normalized metadata model of the declared schema.
//!
//! The schema-parsing layer resolves directives into [`Entity`] values; this
//! module validates their invariants once and then serves read-only lookups
//! to the compiler and the reconciliation engine. A built [`Schema`] is never
//! mutated, so it can be shared behind an `Arc` without locking.

pub mod auth;
pub mod entity;
pub mod index;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::{
    AuthOperation, AuthorizationRules, FilterRule, RuleWhere, ValidateRule, ValidationTiming,
};
pub use entity::{Direction, Entity, Field, FieldKind, LimitSpec, Relationship, ScalarType};
pub use index::{
    FulltextIndex, SearchIndexSpec, SearchKind, Similarity, UniquenessKind, UniquenessSpec,
    VectorIndex,
};

/// Invariant violations detected while building a [`Schema`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two entities share a name.
    #[error("entity '{entity}' is declared more than once")]
    DuplicateEntity { entity: String },
    /// A label is blank.
    #[error("entity '{entity}' has an empty label")]
    EmptyLabel { entity: String },
    /// Two fields share a declared name.
    #[error("field '{field}' is declared more than once on '{entity}'")]
    DuplicateField { entity: String, field: String },
    /// Two fields resolve to the same stored property.
    #[error("fields '{first}' and '{second}' on '{entity}' both map to property '{property}'")]
    DuplicateProperty {
        entity: String,
        first: String,
        second: String,
        property: String,
    },
    /// A relationship points at an undeclared entity.
    #[error("relationship '{entity}.{field}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        field: String,
        target: String,
    },
    /// Two search indexes share a name anywhere in the schema.
    #[error("search index name '{index}' is used more than once")]
    DuplicateIndexName { index: String },
    /// Two search indexes share an operation name.
    #[error("search query name '{query}' is used more than once")]
    DuplicateQueryName { query: String },
    /// A search index covers no fields.
    #[error("search index '{index}' on '{entity}' has no fields")]
    EmptyIndexFields { entity: String, index: String },
    /// A search index names a field the entity does not declare.
    #[error("search index '{index}' on '{entity}' references unknown field '{field}'")]
    UnknownIndexField {
        entity: String,
        index: String,
        field: String,
    },
    /// A search index names a field of the wrong type.
    #[error("search index '{index}' on '{entity}' cannot index field '{field}'")]
    InvalidIndexField {
        entity: String,
        index: String,
        field: String,
    },
    /// A vector index has zero dimensions.
    #[error("vector index '{index}' on '{entity}' must have at least one dimension")]
    ZeroDimensions { entity: String, index: String },
    /// A uniqueness requirement names a field the entity does not declare.
    #[error("uniqueness on '{entity}' references unknown scalar field '{field}'")]
    UnknownUniqueField { entity: String, field: String },
    /// Limit default exceeds limit max.
    #[error("limit on '{entity}' has default {default} above max {max}")]
    InvalidLimit {
        entity: String,
        default: u64,
        max: u64,
    },
}

/// A search index together with the entity that owns it.
#[derive(Clone, Copy, Debug)]
pub struct SearchIndexRef<'a> {
    /// Owning entity.
    pub entity: &'a Entity,
    /// Index declaration.
    pub spec: &'a SearchIndexSpec,
}

#[derive(Deserialize)]
struct SchemaDef {
    entities: Vec<Entity>,
}

/// Validated, read-only collection of entities.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "SchemaDef")]
pub struct Schema {
    entities: Vec<Entity>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    #[serde(skip)]
    search_by_name: HashMap<String, (usize, usize)>,
    #[serde(skip)]
    search_by_query: HashMap<String, (usize, usize)>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = SchemaError;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        Schema::new(def.entities)
    }
}

impl Schema {
    /// Validates and indexes the supplied entities.
    pub fn new(mut entities: Vec<Entity>) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::with_capacity(entities.len());
        for (idx, entity) in entities.iter_mut().enumerate() {
            if by_name.insert(entity.name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateEntity {
                    entity: entity.name.clone(),
                });
            }
            if entity.labels.is_empty() {
                entity.labels.push(entity.name.clone());
            }
            normalize_search_names(entity);
        }

        for entity in &entities {
            validate_entity(entity, &by_name)?;
        }

        let mut search_by_name = HashMap::new();
        let mut search_by_query = HashMap::new();
        for (entity_idx, entity) in entities.iter().enumerate() {
            for (spec_idx, spec) in entity.search_indexes.iter().enumerate() {
                if search_by_name
                    .insert(spec.name().to_owned(), (entity_idx, spec_idx))
                    .is_some()
                {
                    return Err(SchemaError::DuplicateIndexName {
                        index: spec.name().to_owned(),
                    });
                }
                if let Some(query) = spec.query_name() {
                    if search_by_query
                        .insert(query.to_owned(), (entity_idx, spec_idx))
                        .is_some()
                    {
                        return Err(SchemaError::DuplicateQueryName {
                            query: query.to_owned(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            entities,
            by_name,
            search_by_name,
            search_by_query,
        })
    }

    /// Parses and validates a JSON schema document (`{"entities": [...]}`).
    pub fn from_json(source: &str) -> crate::Result<Self> {
        let def: SchemaDef = serde_json::from_str(source)
            .map_err(|err| crate::Error::InvalidInput(format!("schema: {err}")))?;
        Ok(Schema::new(def.entities)?)
    }

    /// All entities in declaration order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Looks up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).map(|idx| &self.entities[*idx])
    }

    /// Looks up a search index by index name.
    pub fn search_index(&self, name: &str) -> Option<SearchIndexRef<'_>> {
        self.search_by_name
            .get(name)
            .map(|(entity, spec)| self.search_ref(*entity, *spec))
    }

    /// Looks up a search index by its operation name.
    pub fn search_by_query_name(&self, query: &str) -> Option<SearchIndexRef<'_>> {
        self.search_by_query
            .get(query)
            .map(|(entity, spec)| self.search_ref(*entity, *spec))
    }

    fn search_ref(&self, entity: usize, spec: usize) -> SearchIndexRef<'_> {
        let entity = &self.entities[entity];
        SearchIndexRef {
            entity,
            spec: &entity.search_indexes[spec],
        }
    }
}

fn normalize_search_names(entity: &mut Entity) {
    let plural = plural_camel(&entity.name);
    let entity_name = entity.name.clone();
    for spec in &mut entity.search_indexes {
        if spec.name().is_empty() {
            let generated = std::iter::once(entity_name.as_str())
                .chain(spec.fields())
                .collect::<Vec<_>>()
                .join("_");
            *spec.name_mut() = generated;
        }
        if spec.query_name().is_none() {
            let infix = match spec.kind() {
                SearchKind::Fulltext => "Fulltext",
                SearchKind::Vector => "Vector",
            };
            let query = format!("{plural}{infix}{}", upper_first(spec.name()));
            *spec.query_name_mut() = Some(query);
        }
    }
}

fn validate_entity(entity: &Entity, known: &HashMap<String, usize>) -> Result<(), SchemaError> {
    if entity.labels.iter().any(|label| label.trim().is_empty()) {
        return Err(SchemaError::EmptyLabel {
            entity: entity.name.clone(),
        });
    }

    let mut names = HashSet::new();
    let mut properties: HashMap<&str, &str> = HashMap::new();
    for field in &entity.fields {
        if !names.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
        match &field.kind {
            FieldKind::Scalar(_) => {
                if let Some(first) = properties.insert(field.property(), &field.name) {
                    return Err(SchemaError::DuplicateProperty {
                        entity: entity.name.clone(),
                        first: first.to_owned(),
                        second: field.name.clone(),
                        property: field.property().to_owned(),
                    });
                }
            }
            FieldKind::Relationship(rel) => {
                if !known.contains_key(&rel.target) {
                    return Err(SchemaError::UnknownTarget {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                        target: rel.target.clone(),
                    });
                }
            }
        }
    }

    for spec in &entity.search_indexes {
        validate_search_index(entity, spec)?;
    }

    for unique in &entity.uniqueness {
        if entity
            .field(&unique.field)
            .and_then(Field::scalar_type)
            .is_none()
        {
            return Err(SchemaError::UnknownUniqueField {
                entity: entity.name.clone(),
                field: unique.field.clone(),
            });
        }
    }

    if let Some(LimitSpec {
        default: Some(default),
        max: Some(max),
    }) = entity.limit
    {
        if default > max {
            return Err(SchemaError::InvalidLimit {
                entity: entity.name.clone(),
                default,
                max,
            });
        }
    }
    Ok(())
}

fn validate_search_index(entity: &Entity, spec: &SearchIndexSpec) -> Result<(), SchemaError> {
    let fields = spec.fields();
    if fields.is_empty() || fields.iter().any(|f| f.is_empty()) {
        return Err(SchemaError::EmptyIndexFields {
            entity: entity.name.clone(),
            index: spec.name().to_owned(),
        });
    }
    for name in fields {
        let Some(field) = entity.field(name) else {
            return Err(SchemaError::UnknownIndexField {
                entity: entity.name.clone(),
                index: spec.name().to_owned(),
                field: name.to_owned(),
            });
        };
        let acceptable = match (spec.kind(), field.scalar_type()) {
            (SearchKind::Fulltext, Some(ty)) => ty.is_textual(),
            (SearchKind::Vector, Some(ScalarType::Float)) => field.list,
            _ => false,
        };
        if !acceptable {
            return Err(SchemaError::InvalidIndexField {
                entity: entity.name.clone(),
                index: spec.name().to_owned(),
                field: name.to_owned(),
            });
        }
    }
    if let SearchIndexSpec::Vector(vector) = spec {
        if vector.dimensions == 0 {
            return Err(SchemaError::ZeroDimensions {
                entity: entity.name.clone(),
                index: spec.name().to_owned(),
            });
        }
    }
    Ok(())
}

/// Lower-camel plural used for generated operation names (`Movie` -> `movies`).
pub(crate) fn plural_camel(name: &str) -> String {
    let mut chars = name.chars();
    let mut lowered = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    let ends_with_consonant_y = lowered.ends_with('y')
        && !lowered
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| "aeiou".contains(c));
    if ends_with_consonant_y {
        lowered.pop();
        lowered.push_str("ies");
    } else if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lowered.ends_with(suffix))
    {
        lowered.push_str("es");
    } else {
        lowered.push('s');
    }
    lowered
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
