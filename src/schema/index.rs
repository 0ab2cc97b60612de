//! Search index and uniqueness declarations.

use serde::{Deserialize, Serialize};

/// Similarity function used by a vector index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclidean,
}

impl Similarity {
    /// Name used in index configuration maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Similarity::Cosine => "cosine",
            Similarity::Euclidean => "euclidean",
        }
    }
}

/// Full-text index over one or more string fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulltextIndex {
    /// Index name; left empty to have one generated at schema build.
    #[serde(default)]
    pub name: String,
    /// Declared field names, resolved through aliasing.
    pub fields: Vec<String>,
    /// Custom search operation name.
    #[serde(default)]
    pub query_name: Option<String>,
}

/// Vector index over a single embedding property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Index name.
    pub name: String,
    /// Declared name of the field holding the embedding.
    pub embedding_field: String,
    /// Embedding dimensionality.
    pub dimensions: u32,
    /// Similarity function.
    #[serde(default)]
    pub similarity: Similarity,
    /// Custom search operation name.
    #[serde(default)]
    pub query_name: Option<String>,
}

/// Declared search index, dispatched by kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchIndexSpec {
    /// `@fulltext` index.
    Fulltext(FulltextIndex),
    /// `@vector` index.
    Vector(VectorIndex),
}

/// Discriminant of [`SearchIndexSpec`] used in messages and catalogue matching.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SearchKind {
    /// Full-text.
    Fulltext,
    /// Vector.
    Vector,
}

impl SearchKind {
    /// Directive spelling used in diagnostics.
    pub fn directive(self) -> &'static str {
        match self {
            SearchKind::Fulltext => "@fulltext",
            SearchKind::Vector => "@vector",
        }
    }

    /// Index type as reported by the live catalogue.
    pub fn catalogue_type(self) -> &'static str {
        match self {
            SearchKind::Fulltext => "FULLTEXT",
            SearchKind::Vector => "VECTOR",
        }
    }
}

impl SearchIndexSpec {
    /// Full-text spec constructor.
    pub fn fulltext<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SearchIndexSpec::Fulltext(FulltextIndex {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            query_name: None,
        })
    }

    /// Vector spec constructor.
    pub fn vector(name: impl Into<String>, embedding_field: impl Into<String>, dimensions: u32) -> Self {
        SearchIndexSpec::Vector(VectorIndex {
            name: name.into(),
            embedding_field: embedding_field.into(),
            dimensions,
            similarity: Similarity::default(),
            query_name: None,
        })
    }

    /// Sets the custom search operation name.
    pub fn with_query_name(mut self, query_name: impl Into<String>) -> Self {
        let slot = match &mut self {
            SearchIndexSpec::Fulltext(spec) => &mut spec.query_name,
            SearchIndexSpec::Vector(spec) => &mut spec.query_name,
        };
        *slot = Some(query_name.into());
        self
    }

    /// Kind discriminant.
    pub fn kind(&self) -> SearchKind {
        match self {
            SearchIndexSpec::Fulltext(_) => SearchKind::Fulltext,
            SearchIndexSpec::Vector(_) => SearchKind::Vector,
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        match self {
            SearchIndexSpec::Fulltext(spec) => &spec.name,
            SearchIndexSpec::Vector(spec) => &spec.name,
        }
    }

    /// Declared field names covered by the index.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            SearchIndexSpec::Fulltext(spec) => spec.fields.iter().map(String::as_str).collect(),
            SearchIndexSpec::Vector(spec) => vec![spec.embedding_field.as_str()],
        }
    }

    /// Custom search operation name, if declared.
    pub fn query_name(&self) -> Option<&str> {
        match self {
            SearchIndexSpec::Fulltext(spec) => spec.query_name.as_deref(),
            SearchIndexSpec::Vector(spec) => spec.query_name.as_deref(),
        }
    }

    pub(crate) fn name_mut(&mut self) -> &mut String {
        match self {
            SearchIndexSpec::Fulltext(spec) => &mut spec.name,
            SearchIndexSpec::Vector(spec) => &mut spec.name,
        }
    }

    pub(crate) fn query_name_mut(&mut self) -> &mut Option<String> {
        match self {
            SearchIndexSpec::Fulltext(spec) => &mut spec.query_name,
            SearchIndexSpec::Vector(spec) => &mut spec.query_name,
        }
    }
}

/// Where a uniqueness requirement came from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniquenessKind {
    /// Explicit `@unique`.
    #[default]
    Unique,
    /// `@id`, which implies uniqueness.
    Identity,
}

/// Declared uniqueness requirement for one field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquenessSpec {
    /// Declared field name.
    pub field: String,
    /// Origin of the requirement.
    #[serde(default)]
    pub kind: UniquenessKind,
    /// Explicit constraint name.
    #[serde(default)]
    pub constraint_name: Option<String>,
}

impl UniquenessSpec {
    /// `@unique` on the given field.
    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: UniquenessKind::Unique,
            constraint_name: None,
        }
    }

    /// `@id` on the given field.
    pub fn identity(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: UniquenessKind::Identity,
            constraint_name: None,
        }
    }

    /// Constraint name, defaulting to `<label>_<property>`.
    pub fn constraint_name_for(&self, label: &str, property: &str) -> String {
        self.constraint_name
            .clone()
            .unwrap_or_else(|| format!("{label}_{property}"))
    }
}
