//! Immutable per-request context threaded through every compilation call.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Verified claims of the caller (decoded token payload).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Value);

impl Claims {
    /// Wraps a claims map.
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Resolves a dotted claim path such as `sub` or `org.id`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.0.lookup(path).filter(|value| !value.is_null())
    }
}

/// Caller identity and target database for one request.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    claims: Option<Claims>,
    database: Option<String>,
}

impl RequestContext {
    /// Context for an unauthenticated caller on the default database.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an authenticated caller.
    pub fn authenticated(claims: Claims) -> Self {
        Self {
            claims: Some(claims),
            database: None,
        }
    }

    /// Targets a named database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Caller claims, absent for unauthenticated requests.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Target database, `None` meaning the executor default.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Whether the caller presented claims.
    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }
}
