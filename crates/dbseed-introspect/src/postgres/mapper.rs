use dbseed_core::{ColumnSchema, FkMap, ForeignKeyEdge, LengthLimit, SafeType, TableSchema};
use tracing::debug;

use crate::options::CatalogOptions;

use super::queries::{RawColumn, RawForeignKey};

pub fn map_table(
    table: &str,
    raw_columns: Vec<RawColumn>,
    primary_key: Option<String>,
    opts: &CatalogOptions,
) -> TableSchema {
    let columns = map_columns(table, raw_columns, opts);
    let schema = TableSchema::new(table, columns);
    match primary_key {
        Some(pk) => schema.with_primary_key(pk),
        None => schema,
    }
}

pub fn map_columns(table: &str, raw: Vec<RawColumn>, opts: &CatalogOptions) -> Vec<ColumnSchema> {
    raw.into_iter()
        .filter_map(|col| {
            let Some(data_type) =
                SafeType::parse(&col.udt_name).or_else(|| SafeType::parse(&col.data_type))
            else {
                debug!(
                    event = "column_dropped",
                    table,
                    column = %col.name,
                    declared_type = %col.data_type,
                    "type outside safe-type allow-list"
                );
                return None;
            };

            let is_serial = opts.serial_as_identity
                && col
                    .default
                    .as_deref()
                    .is_some_and(|default| default.starts_with("nextval("));

            Some(ColumnSchema {
                name: col.name,
                data_type,
                declared_type: col.data_type,
                is_nullable: col.is_nullable,
                max_length: data_type
                    .is_textual()
                    .then(|| LengthLimit::from_catalog(col.character_max_length)),
                numeric_precision: non_negative(col.numeric_precision),
                numeric_scale: non_negative(col.numeric_scale),
                is_identity: col.is_identity || is_serial,
                is_computed: col.is_generated,
                description: if opts.include_comments {
                    col.comment.filter(|comment| !comment.trim().is_empty())
                } else {
                    None
                },
            })
        })
        .collect()
}

pub fn map_foreign_keys(raw: Vec<RawForeignKey>) -> FkMap {
    FkMap::from_edges(raw.into_iter().map(|fk| ForeignKeyEdge {
        child_table: fk.child_table,
        child_column: fk.child_column,
        parent_table: fk.parent_table,
    }))
}

fn non_negative(value: Option<i32>) -> Option<u32> {
    value.and_then(|value| u32::try_from(value).ok())
}
