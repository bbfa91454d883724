use async_trait::async_trait;

use dbseed_core::{FkMap, Result, TableSchema};

/// Read-only view of the target database's structure.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Base tables of the target schema, sorted by name.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Usable columns and primary key of one table.
    ///
    /// Never fails: when the metadata cannot be read the table comes back
    /// empty and callers skip it.
    async fn describe_table(&self, table: &str) -> TableSchema;

    /// Every foreign-key column of the schema, keyed by child table.
    async fn build_foreign_key_map(&self) -> Result<FkMap>;
}
