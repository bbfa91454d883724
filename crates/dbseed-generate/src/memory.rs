//! In-memory catalog and target for exercising the engine without a database.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use dbseed_core::{
    ColumnSchema, Error, FkMap, ForeignKeyEdge, GeneratedValue, Result, SafeType, TableSchema,
};
use dbseed_introspect::SchemaCatalog;

use crate::target::{RowBatch, SeedTarget};

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, TableSchema>,
    fk_map: FkMap,
    unreadable: BTreeSet<String>,
    fk_map_error: Option<String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn with_foreign_key(mut self, child: &str, column: &str, parent: &str) -> Self {
        self.fk_map.insert(ForeignKeyEdge {
            child_table: child.to_string(),
            child_column: column.to_string(),
            parent_table: parent.to_string(),
        });
        self
    }

    /// The table is listed but its metadata cannot be read.
    pub fn with_unreadable_table(mut self, table: &str) -> Self {
        self.unreadable.insert(table.to_string());
        self
    }

    pub fn with_fk_map_error(mut self, message: &str) -> Self {
        self.fk_map_error = Some(message.to_string());
        self
    }
}

#[async_trait]
impl SchemaCatalog for MemoryCatalog {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.tables.keys().cloned().collect();
        names.extend(self.unreadable.iter().cloned());
        Ok(names.into_iter().collect())
    }

    async fn describe_table(&self, table: &str) -> TableSchema {
        if self.unreadable.contains(table) {
            return TableSchema::empty(table);
        }
        self.tables
            .get(table)
            .cloned()
            .unwrap_or_else(|| TableSchema::empty(table))
    }

    async fn build_foreign_key_map(&self) -> Result<FkMap> {
        match &self.fk_map_error {
            Some(message) => Err(Error::Db(message.clone())),
            None => Ok(self.fk_map.clone()),
        }
    }
}

type Row = BTreeMap<String, GeneratedValue>;

/// Records inserted rows and constraint calls; assigns missing primary keys
/// the way a database sequence would.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    rows: BTreeMap<String, Vec<Row>>,
    existing_keys: BTreeMap<String, Vec<GeneratedValue>>,
    failing_inserts: BTreeSet<String>,
    fail_suspend: bool,
    fail_restore: bool,
    suspended: bool,
    suspend_calls: usize,
    restore_calls: usize,
    next_id: i64,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `table` already holds rows with these keys.
    pub fn with_existing_keys(mut self, table: &str, keys: Vec<GeneratedValue>) -> Self {
        self.existing_keys.insert(table.to_string(), keys);
        self
    }

    pub fn fail_inserts_into(mut self, table: &str) -> Self {
        self.failing_inserts.insert(table.to_string());
        self
    }

    pub fn fail_suspend(mut self) -> Self {
        self.fail_suspend = true;
        self
    }

    pub fn fail_restore(mut self) -> Self {
        self.fail_restore = true;
        self
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.rows.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn column_values(&self, table: &str, column: &str) -> Vec<GeneratedValue> {
        self.rows(table)
            .iter()
            .filter_map(|row| row.get(column).cloned())
            .collect()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn suspend_calls(&self) -> usize {
        self.suspend_calls
    }

    pub fn restore_calls(&self) -> usize {
        self.restore_calls
    }

    fn assign_key(&mut self, key: &ColumnSchema) -> GeneratedValue {
        if key.data_type == SafeType::Uuid {
            return GeneratedValue::Uuid(uuid::Uuid::new_v4());
        }
        self.next_id += 1;
        if key.data_type.is_textual() {
            GeneratedValue::Text(self.next_id.to_string())
        } else {
            GeneratedValue::Int(self.next_id)
        }
    }
}

#[async_trait]
impl SeedTarget for MemoryTarget {
    async fn suspend_constraints(&mut self, _tables: &[String]) -> Result<()> {
        self.suspend_calls += 1;
        if self.fail_suspend {
            return Err(Error::Db("permission denied to disable triggers".to_string()));
        }
        self.suspended = true;
        Ok(())
    }

    async fn restore_constraints(&mut self, _tables: &[String]) -> Result<()> {
        self.restore_calls += 1;
        if self.fail_restore {
            return Err(Error::Db("permission denied to enable triggers".to_string()));
        }
        self.suspended = false;
        Ok(())
    }

    async fn insert_rows(&mut self, batch: &RowBatch) -> Result<Vec<GeneratedValue>> {
        if self.failing_inserts.contains(&batch.table) {
            return Err(Error::Db(format!(
                "insert into \"{}\" violates check constraint\nDETAIL: simulated",
                batch.table
            )));
        }

        let mut inserted = Vec::with_capacity(batch.rows.len());
        let mut keys = Vec::new();
        for values in &batch.rows {
            if values.len() != batch.columns.len() {
                return Err(Error::Other(format!(
                    "row has {} values for {} columns",
                    values.len(),
                    batch.columns.len()
                )));
            }
            let mut row: Row = batch
                .columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect();
            if let Some(key) = &batch.returning {
                let value = match row.get(&key.name) {
                    Some(value) => value.clone(),
                    None => {
                        let value = self.assign_key(key);
                        row.insert(key.name.clone(), value.clone());
                        value
                    }
                };
                keys.push(value);
            }
            inserted.push(row);
        }

        self.rows.entry(batch.table.clone()).or_default().extend(inserted);
        Ok(keys)
    }

    async fn sample_keys(
        &mut self,
        table: &str,
        key: &ColumnSchema,
        limit: usize,
    ) -> Result<Vec<GeneratedValue>> {
        let existing = self.existing_keys.get(table).into_iter().flatten().cloned();
        let inserted = self.column_values(table, &key.name).into_iter();
        Ok(existing
            .chain(inserted)
            .filter(|value| !value.is_null())
            .take(limit)
            .collect())
    }
}
