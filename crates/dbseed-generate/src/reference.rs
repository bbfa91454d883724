use std::collections::HashMap;

use rand::{Rng, RngCore};
use tracing::{debug, warn};

use dbseed_core::{ColumnSchema, GeneratedValue, SafeType, TableSchema};

use crate::coerce::coerce;
use crate::providers::defaults::random_uuid;
use crate::target::SeedTarget;

pub const DEFAULT_SAMPLE_CAP: usize = 1000;

/// Known primary-key values per table, sampled from the database or recorded
/// after inserts. Entries only grow during a run and never exceed the cap.
#[derive(Debug, Clone)]
pub struct ReferenceCache {
    entries: HashMap<String, Vec<GeneratedValue>>,
    cap: usize,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAP)
    }
}

impl ReferenceCache {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            cap: cap.max(1),
        }
    }

    pub fn is_loaded(&self, table: &str) -> bool {
        self.entries.contains_key(table)
    }

    /// Number of cached keys for `table`.
    pub fn len(&self, table: &str) -> usize {
        self.entries.get(table).map_or(0, Vec::len)
    }

    pub fn values(&self, table: &str) -> &[GeneratedValue] {
        self.entries.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Store a sampled entry. An existing entry is left untouched.
    pub fn insert_loaded(&mut self, table: &str, mut values: Vec<GeneratedValue>) {
        values.retain(|value| !value.is_null());
        values.truncate(self.cap);
        self.entries.entry(table.to_string()).or_insert(values);
    }

    /// Append freshly inserted keys to an existing entry, up to the cap.
    pub fn record_inserted(&mut self, table: &str, keys: Vec<GeneratedValue>) {
        let cap = self.cap;
        let entry = self.entries.entry(table.to_string()).or_default();
        let room = cap.saturating_sub(entry.len());
        entry.extend(keys.into_iter().filter(|key| !key.is_null()).take(room));
    }

    pub fn sample(&self, table: &str, rng: &mut dyn RngCore) -> Option<GeneratedValue> {
        let values = self.entries.get(table)?;
        if values.is_empty() {
            return None;
        }
        Some(values[rng.random_range(0..values.len())].clone())
    }

    /// Sample `table`'s primary keys from the target unless an entry already
    /// exists. Failures leave an empty entry behind so the read is not retried.
    pub async fn ensure_loaded<T: SeedTarget + ?Sized>(
        &mut self,
        target: &mut T,
        schema: Option<&TableSchema>,
        table: &str,
    ) -> usize {
        if self.is_loaded(table) {
            return self.len(table);
        }

        let Some(key) = schema.and_then(TableSchema::primary_key_column) else {
            debug!(event = "reference_unavailable", table, "no usable primary key column");
            self.insert_loaded(table, Vec::new());
            return 0;
        };

        match target.sample_keys(table, key, self.cap).await {
            Ok(values) => {
                self.insert_loaded(table, values);
                let loaded = self.len(table);
                debug!(event = "reference_loaded", table, keys = loaded);
                loaded
            }
            Err(err) => {
                warn!(event = "reference_sample_failed", table, error = %err);
                self.insert_loaded(table, Vec::new());
                0
            }
        }
    }
}

/// Orphan value for a foreign-key column whose parent has no known keys.
pub fn fallback_reference(column: &ColumnSchema, rng: &mut dyn RngCore) -> GeneratedValue {
    if column.data_type == SafeType::Uuid {
        return GeneratedValue::Uuid(random_uuid(rng));
    }
    let candidate = GeneratedValue::Int(rng.random_range(1..=10));
    coerce(candidate, column).unwrap_or(GeneratedValue::Null)
}
