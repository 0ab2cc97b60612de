//! Index and constraint reconciliation.
//!
//! Compares the search indexes and uniqueness constraints a schema declares
//! with the live catalogue. Every declaration is checked and every mismatch
//! reported together; with `create` enabled, missing objects are created
//! one after another using `IF NOT EXISTS` statements, so repeated runs are
//! idempotent. Existing indexes are never altered.

mod plan;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::executor::{CatalogueEntry, CatalogueKind, Executor};
use crate::schema::{Schema, SearchKind};
use crate::Result;

pub use plan::{
    required_objects, IndexField, RequiredConstraint, RequiredIndex, RequiredObject, VectorConfig,
};

/// Reconciliation settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Target database, `None` for the executor default.
    pub database: Option<String>,
    /// Create missing objects instead of reporting them.
    pub create: bool,
}

/// One difference between declared and live objects.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mismatch {
    /// No live index by that name.
    MissingIndex {
        /// Index kind.
        kind: SearchKind,
        /// Index name.
        index: String,
        /// Owning entity.
        entity: String,
    },
    /// The live index lacks a declared field.
    MissingIndexField {
        /// Index kind.
        kind: SearchKind,
        /// Index name.
        index: String,
        /// Owning entity.
        entity: String,
        /// Declared field and stored property.
        field: IndexField,
    },
    /// The live index lacks a field and would have to be altered.
    ExistingIndexMissingField {
        /// Index kind.
        kind: SearchKind,
        /// Index name.
        index: String,
        /// Owning entity.
        entity: String,
        /// Declared field whose stored property the live index lacks.
        field: IndexField,
    },
    /// A live index holds the name but is of another type or covers none
    /// of the entity labels.
    IndexConflict {
        /// Index kind.
        kind: SearchKind,
        /// Index name.
        index: String,
        /// Owning entity.
        entity: String,
        /// Store type of the live index.
        found_type: String,
        /// Labels the live index covers.
        found_labels: Vec<String>,
    },
    /// No uniqueness constraint covers the property on any entity label.
    MissingConstraint {
        /// Primary label.
        label: String,
        /// Stored property.
        property: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MissingIndex {
                kind,
                index,
                entity,
            } => write!(
                f,
                "Missing {} index '{index}' on Node '{entity}'",
                kind.directive()
            ),
            Mismatch::MissingIndexField {
                kind,
                index,
                entity,
                field,
            } => {
                write!(
                    f,
                    "{} index '{index}' on Node '{entity}' is missing field '{}'",
                    kind.directive(),
                    field.field
                )?;
                if field.is_aliased() {
                    write!(f, " aliased to field '{}'", field.property)?;
                }
                Ok(())
            }
            Mismatch::ExistingIndexMissingField {
                kind,
                index,
                entity,
                field,
            } => {
                write!(
                    f,
                    "{} index '{index}' on Node '{entity}' already exists, but is missing field '{}'",
                    kind.directive(),
                    field.field
                )?;
                if field.is_aliased() {
                    write!(f, " aliased to field '{}'", field.property)?;
                }
                Ok(())
            }
            Mismatch::IndexConflict {
                kind,
                index,
                entity,
                found_type,
                found_labels,
            } => write!(
                f,
                "{} index '{index}' on Node '{entity}' conflicts with existing {found_type} index of the same name on [{}]",
                kind.directive(),
                found_labels.join(", ")
            ),
            Mismatch::MissingConstraint { label, property } => {
                write!(f, "Missing constraint for {label}.{property}")
            }
        }
    }
}

/// Unresolved mismatches, one per line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileError {
    /// Every mismatch found.
    pub problems: Vec<Mismatch>,
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, problem) in self.problems.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ReconcileError {}

/// Checks and creates declared indexes and constraints.
#[derive(Clone, Debug)]
pub struct Reconciler {
    schema: Arc<Schema>,
}

impl Reconciler {
    /// Creates a reconciler for `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    /// Everything the schema requires, without consulting the store.
    pub fn plan(&self) -> Vec<RequiredObject> {
        required_objects(&self.schema)
    }

    /// Verifies every declared index and constraint, creating missing ones
    /// when `options.create` is set.
    ///
    /// Mismatches that creation cannot fix (an existing index missing a
    /// field, or a name held by an unrelated index) are reported before
    /// anything is created. Creation stops at
    /// the first failing statement; objects created before it remain.
    pub async fn assert_indexes_and_constraints<E>(
        &self,
        executor: &E,
        options: &ReconcileOptions,
    ) -> Result<()>
    where
        E: Executor + ?Sized,
    {
        let database = options.database.as_deref();
        let (indexes, constraints) = tokio::try_join!(
            executor.inspect_catalogue(CatalogueKind::Index, database),
            executor.inspect_catalogue(CatalogueKind::Constraint, database),
        )?;
        debug!(
            indexes = indexes.len(),
            constraints = constraints.len(),
            "inspected catalogue"
        );

        let mut problems = Vec::new();
        let mut missing = Vec::new();
        for object in self.plan() {
            let state = match &object {
                RequiredObject::Index(index) => check_index(index, &indexes, options.create),
                RequiredObject::Constraint(constraint) => {
                    if constraint_satisfied(constraint, &constraints) {
                        ObjectState::Satisfied
                    } else {
                        ObjectState::Absent
                    }
                }
            };
            match state {
                ObjectState::Satisfied => {}
                ObjectState::Absent => missing.push(object),
                ObjectState::Mismatched(found) => problems.extend(found),
            }
        }

        if !options.create {
            problems.extend(missing.iter().map(absent));
            missing.clear();
        }
        if !problems.is_empty() {
            for problem in &problems {
                warn!(%problem, "schema mismatch");
            }
            return Err(ReconcileError { problems }.into());
        }

        for object in &missing {
            match object {
                RequiredObject::Index(index) => {
                    executor.create_index(index, database).await?;
                    info!(index = %index.name, entity = %index.entity, "created index");
                }
                RequiredObject::Constraint(constraint) => {
                    executor.create_constraint(constraint, database).await?;
                    info!(
                        constraint = %constraint.name,
                        entity = %constraint.entity,
                        "created constraint"
                    );
                }
            }
        }
        Ok(())
    }
}

enum ObjectState {
    Satisfied,
    Absent,
    Mismatched(Vec<Mismatch>),
}

fn check_index(index: &RequiredIndex, live: &[CatalogueEntry], create: bool) -> ObjectState {
    let Some(existing) = live.iter().find(|entry| entry.name == index.name) else {
        // An equivalent index under another name on any entity label counts.
        let equivalent = live.iter().any(|entry| {
            covers_labels(index, entry)
                && index
                    .fields
                    .iter()
                    .all(|field| entry.properties.contains(&field.property))
        });
        return if equivalent {
            ObjectState::Satisfied
        } else {
            ObjectState::Absent
        };
    };

    if !covers_labels(index, existing) {
        return ObjectState::Mismatched(vec![Mismatch::IndexConflict {
            kind: index.kind,
            index: index.name.clone(),
            entity: index.entity.clone(),
            found_type: existing.object_type.clone(),
            found_labels: existing.labels_or_types.clone(),
        }]);
    }

    let found: Vec<Mismatch> = index
        .fields
        .iter()
        .filter(|field| !existing.properties.contains(&field.property))
        .map(|field| {
            if create {
                Mismatch::ExistingIndexMissingField {
                    kind: index.kind,
                    index: index.name.clone(),
                    entity: index.entity.clone(),
                    field: field.clone(),
                }
            } else {
                Mismatch::MissingIndexField {
                    kind: index.kind,
                    index: index.name.clone(),
                    entity: index.entity.clone(),
                    field: field.clone(),
                }
            }
        })
        .collect();
    if found.is_empty() {
        ObjectState::Satisfied
    } else {
        ObjectState::Mismatched(found)
    }
}

/// Same index type on nodes of at least one entity label.
fn covers_labels(index: &RequiredIndex, entry: &CatalogueEntry) -> bool {
    entry.is_node()
        && entry.object_type == index.kind.catalogue_type()
        && entry
            .labels_or_types
            .iter()
            .any(|label| index.labels.contains(label))
}

fn constraint_satisfied(constraint: &RequiredConstraint, live: &[CatalogueEntry]) -> bool {
    live.iter().any(|entry| {
        entry.is_node()
            && entry.enforces_uniqueness()
            && entry.properties.len() == 1
            && entry.properties[0] == constraint.property
            && entry
                .labels_or_types
                .iter()
                .any(|label| constraint.labels.contains(label))
    })
}

fn absent(object: &RequiredObject) -> Mismatch {
    match object {
        RequiredObject::Index(index) => Mismatch::MissingIndex {
            kind: index.kind,
            index: index.name.clone(),
            entity: index.entity.clone(),
        },
        RequiredObject::Constraint(constraint) => Mismatch::MissingConstraint {
            label: constraint.primary_label().to_owned(),
            property: constraint.property.clone(),
        },
    }
}
