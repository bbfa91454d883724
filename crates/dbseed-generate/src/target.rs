use async_trait::async_trait;

use dbseed_core::{ColumnSchema, GeneratedValue, Result};

/// Rows for one table, column-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<GeneratedValue>>,
    /// Primary key to read back from the insert, when the table has one.
    pub returning: Option<ColumnSchema>,
}

impl RowBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Database the engine writes into.
#[async_trait]
pub trait SeedTarget: Send {
    /// Disable constraint and trigger enforcement for `tables`. Idempotent.
    async fn suspend_constraints(&mut self, tables: &[String]) -> Result<()>;

    /// Re-enable enforcement for `tables`. Idempotent.
    async fn restore_constraints(&mut self, tables: &[String]) -> Result<()>;

    /// Insert the whole batch in one transaction and return the primary-key
    /// values of the inserted rows. On error nothing from the batch is kept.
    async fn insert_rows(&mut self, batch: &RowBatch) -> Result<Vec<GeneratedValue>>;

    /// Read up to `limit` existing non-null values of `key` from `table`.
    async fn sample_keys(
        &mut self,
        table: &str,
        key: &ColumnSchema,
        limit: usize,
    ) -> Result<Vec<GeneratedValue>>;
}
