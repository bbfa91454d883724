//! Core contracts and helpers for dbseed.
//!
//! This crate defines the schema model the seeding engine works on, the
//! safe-type allow-list, synthesized values, and the dependency resolver
//! shared by the catalog adapters and the CLI.

pub mod error;
pub mod graph;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use graph::{DependencyOrder, resolve_order};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use schema::{ColumnSchema, FkMap, ForeignKeyEdge, TableSchema, DEFAULT_PRIMARY_KEY};
pub use types::{LengthLimit, SafeType};
pub use value::GeneratedValue;
