use thiserror::Error;

use crate::compiler::CompileError;
use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::reconcile::ReconcileError;
use crate::schema::SchemaError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Request failed validation before a statement was built.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Schema metadata violates an invariant.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A validate rule failed; the operation was aborted.
    #[error("Forbidden")]
    Forbidden,
    /// A write violated a uniqueness constraint.
    #[error("Constraint validation failed")]
    ConstraintValidationFailed,
    /// Declared indexes or constraints do not match the live catalogue.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// Error surfaced by the executor, propagated unmodified.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Malformed request or schema document.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the caller can recover by correcting the request.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Compile(_) | Error::InvalidInput(_))
    }
}
