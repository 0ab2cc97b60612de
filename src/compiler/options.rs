use serde::{Deserialize, Serialize};

/// Knobs applied to every compiled statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Page size used when neither request nor entity names one.
    pub default_limit: Option<u64>,
    /// Cap applied when the entity declares none.
    pub max_limit: Option<u64>,
    /// Procedure emitted for write-time validation checks.
    pub validate_procedure: String,
    /// Function emitted for row-level read validation checks.
    pub validate_predicate_function: String,
    /// Neighbours requested from a vector index when the page is unbounded.
    pub vector_neighbours: u64,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            default_limit: None,
            max_limit: None,
            validate_procedure: "apoc.util.validate".to_owned(),
            validate_predicate_function: "apoc.util.validatePredicate".to_owned(),
            vector_neighbours: 100,
        }
    }
}
