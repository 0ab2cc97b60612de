//! Schema-driven compiler from declarative graph requests to parameterized
//! Cypher, plus a reconciler that keeps the store's search indexes and
//! uniqueness constraints in line with the schema.
//!
//! The crate never connects to a database. Callers build a [`Schema`],
//! compile [`Operation`]s with a [`Compiler`], and hand the resulting
//! [`CompiledStatement`] to their own [`Executor`]. [`execute`] wires the
//! two together and shapes connection results.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cypherforge::{Compiler, CompilerOptions, Operation, RequestContext, Schema};
//!
//! # fn main() -> cypherforge::Result<()> {
//! let schema = Schema::from_json(r#"{"entities": [{"name": "Movie", "fields": [
//!     {"name": "title", "kind": {"scalar": "String"}}
//! ]}]}"#)?;
//! let compiler = Compiler::new(Arc::new(schema), CompilerOptions::default());
//! let op: Operation = serde_json::from_str(
//!     r#"{"operation": "read", "entity": "Movie", "selection": ["title"]}"#,
//! )
//! .map_err(|err| cypherforge::Error::InvalidInput(err.to_string()))?;
//! let compiled = compiler.compile(&op, &RequestContext::anonymous())?;
//! println!("{}", compiled.cypher);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod compiler;
pub mod config;
pub mod context;
pub mod cypher;
pub mod error;
pub mod executor;
pub mod filter;
pub mod paginate;
pub mod reconcile;
pub mod request;
pub mod schema;
pub mod shape;
pub mod value;

pub use compiler::{CompileError, CompiledStatement, Compiler, CompilerOptions, StatementKind};
pub use config::{Config, ConfigError};
pub use context::{Claims, RequestContext};
pub use error::{Error, Result};
pub use executor::{execute, Executor, ExecutorError, Row};
pub use reconcile::{ReconcileError, ReconcileOptions, Reconciler};
pub use request::Operation;
pub use schema::{Entity, Schema, SchemaError};
pub use value::{Params, Value};
