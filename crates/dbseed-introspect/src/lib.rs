//! Schema Catalog: discovers tables, usable columns and foreign keys.
//!
//! Columns outside the safe-type allow-list are dropped here, before any
//! other component sees them.

pub mod catalog;
pub mod options;
pub mod postgres;

pub use catalog::SchemaCatalog;
pub use options::CatalogOptions;
pub use postgres::PostgresCatalog;

pub use dbseed_core::{FkMap, TableSchema};
