//! TOML configuration for the compiler and the reconciler.
//!
//! ```toml
//! [compiler]
//! default_limit = 20
//! max_limit = 100
//!
//! [reconcile]
//! database = "movies"
//! create = true
//! ```
//!
//! Every key is optional; absent sections fall back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::CompilerOptions;
use crate::reconcile::ReconcileOptions;

/// Failure loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Offending path, `<inline>` for string sources.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
}

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Statement compilation settings.
    pub compiler: CompilerOptions,
    /// Index and constraint reconciliation settings.
    pub reconcile: ReconcileOptions,
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
