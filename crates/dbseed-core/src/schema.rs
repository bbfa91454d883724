use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{LengthLimit, SafeType};

/// Primary key column assumed when the catalog cannot name one.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Column metadata for a table, already filtered through the safe-type allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: SafeType,
    /// Type name as the catalog reported it.
    pub declared_type: String,
    pub is_nullable: bool,
    /// Only set for character types.
    pub max_length: Option<LengthLimit>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub is_identity: bool,
    pub is_computed: bool,
    /// Human-readable description (column comment), when one exists.
    pub description: Option<String>,
}

impl ColumnSchema {
    /// Minimal column of the given type; mostly useful for tests and fixtures.
    pub fn new(name: impl Into<String>, data_type: SafeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            declared_type: data_type.as_str().to_string(),
            is_nullable: true,
            max_length: data_type.is_textual().then_some(LengthLimit::Unbounded),
            numeric_precision: None,
            numeric_scale: None,
            is_identity: false,
            is_computed: false,
            description: None,
        }
    }

    pub fn with_max_length(mut self, len: u32) -> Self {
        self.max_length = Some(LengthLimit::Bounded(len));
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.is_computed = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The database assigns this column's value; the engine must not supply one.
    pub fn is_database_assigned(&self) -> bool {
        self.is_identity || self.is_computed
    }
}

/// A table's usable columns and its primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Columns in catalog ordinal order.
    pub columns: Vec<ColumnSchema>,
    /// Best-effort primary key column; [`DEFAULT_PRIMARY_KEY`] when undiscoverable.
    pub primary_key: String,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
        }
    }

    /// Schema used when metadata could not be read; callers skip such tables.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&ColumnSchema> {
        self.column(&self.primary_key)
    }
}

/// One foreign-key column pointing at a parent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
}

/// Foreign keys keyed by child table, then child column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkMap {
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl FkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges(edges: impl IntoIterator<Item = ForeignKeyEdge>) -> Self {
        let mut map = Self::new();
        for edge in edges {
            map.insert(edge);
        }
        map
    }

    pub fn insert(&mut self, edge: ForeignKeyEdge) {
        self.tables
            .entry(edge.child_table)
            .or_default()
            .insert(edge.child_column, edge.parent_table);
    }

    /// Parent table referenced by `table.column`, if any.
    pub fn parent_of(&self, table: &str, column: &str) -> Option<&str> {
        self.tables
            .get(table)
            .and_then(|columns| columns.get(column))
            .map(String::as_str)
    }

    /// Column → parent mapping for one child table.
    pub fn columns_of(&self, table: &str) -> Option<&BTreeMap<String, String>> {
        self.tables.get(table)
    }

    pub fn edges(&self) -> impl Iterator<Item = ForeignKeyEdge> + '_ {
        self.tables.iter().flat_map(|(table, columns)| {
            columns.iter().map(move |(column, parent)| ForeignKeyEdge {
                child_table: table.clone(),
                child_column: column.clone(),
                parent_table: parent.clone(),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
