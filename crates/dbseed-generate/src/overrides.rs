use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use dbseed_core::ForeignKeyEdge;
use tracing::{info, warn};

use crate::errors::SeedError;
use crate::providers::Provider;

/// Operator-supplied `table → column → provider` assignments.
#[derive(Debug, Clone, Default)]
pub struct OverrideMap {
    entries: HashMap<String, HashMap<String, Provider>>,
}

impl OverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an override file. Unknown or malformed directives are logged and
    /// skipped; a file that is not valid JSON is an error.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        let map = Self::from_json_str(&raw)?;
        info!(
            event = "overrides_loaded",
            path = %path.display(),
            columns = map.len()
        );
        Ok(map)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SeedError> {
        let parsed: BTreeMap<String, BTreeMap<String, String>> = serde_json::from_str(raw)?;
        let mut map = Self::new();
        for (table, columns) in parsed {
            for (column, directive) in columns {
                match Provider::parse(&directive) {
                    Ok(provider) => map.insert(&table, &column, provider),
                    Err(err) => warn!(
                        event = "override_ignored",
                        table = %table,
                        column = %column,
                        directive = %directive,
                        error = %err
                    ),
                }
            }
        }
        Ok(map)
    }

    pub fn insert(&mut self, table: &str, column: &str, provider: Provider) {
        self.entries
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), provider);
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&Provider> {
        self.entries.get(table).and_then(|columns| columns.get(column))
    }

    /// Edges declared by `foreign_key:<parent>` directives.
    pub fn foreign_keys(&self) -> impl Iterator<Item = ForeignKeyEdge> + '_ {
        self.entries.iter().flat_map(|(table, columns)| {
            columns.iter().filter_map(move |(column, provider)| match provider {
                Provider::ForeignKey { parent } => Some(ForeignKeyEdge {
                    child_table: table.clone(),
                    child_column: column.clone(),
                    parent_table: parent.clone(),
                }),
                _ => None,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_valid_directives_and_skips_bad_ones() {
        let raw = r##"{
            "customer": {
                "email": "email",
                "tax_number": "numerify:##########",
                "mood": "telepathy"
            },
            "order": { "customer_id": "foreign_key:customer" }
        }"##;
        let map = OverrideMap::from_json_str(raw).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("customer", "email"), Some(&Provider::Email));
        assert_eq!(map.get("customer", "mood"), None);
        assert_eq!(
            map.get("order", "customer_id"),
            Some(&Provider::ForeignKey {
                parent: "customer".to_string()
            })
        );

        let edges: Vec<ForeignKeyEdge> = map.foreign_keys().collect();
        assert_eq!(
            edges,
            vec![ForeignKeyEdge {
                child_table: "order".to_string(),
                child_column: "customer_id".to_string(),
                parent_table: "customer".to_string(),
            }]
        );
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            OverrideMap::from_json_str("[1, 2"),
            Err(SeedError::Json(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("dbseed-overrides-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"product": {"barcode": "ean13"}}"#).unwrap();
        let map = OverrideMap::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(map.get("product", "barcode"), Some(&Provider::Ean13));
    }
}
