use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use dbseed_core::{FkMap, Result, TableSchema};

use crate::catalog::SchemaCatalog;
use crate::options::CatalogOptions;

mod mapper;
mod queries;

/// Schema catalog backed by `pg_catalog` and `information_schema`.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    opts: CatalogOptions,
}

impl PostgresCatalog {
    /// Create a catalog over a pre-configured pool.
    pub fn new(pool: PgPool, opts: CatalogOptions) -> Self {
        Self { pool, opts }
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.opts
    }

    async fn try_describe(&self, table: &str) -> Result<TableSchema> {
        let schema = &self.opts.schema;
        let raw_columns = queries::list_columns(&self.pool, schema, table).await?;
        let primary_key = queries::primary_key_column(&self.pool, schema, table).await?;
        Ok(mapper::map_table(table, raw_columns, primary_key, &self.opts))
    }
}

#[async_trait]
impl SchemaCatalog for PostgresCatalog {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        queries::list_tables(&self.pool, &self.opts.schema).await
    }

    async fn describe_table(&self, table: &str) -> TableSchema {
        match self.try_describe(table).await {
            Ok(schema) => {
                debug!(
                    event = "table_described",
                    table,
                    columns = schema.columns.len(),
                    primary_key = %schema.primary_key
                );
                schema
            }
            Err(err) => {
                warn!(event = "describe_failed", table, error = %err, "treating table as empty");
                TableSchema::empty(table)
            }
        }
    }

    async fn build_foreign_key_map(&self) -> Result<FkMap> {
        let raw = queries::list_foreign_keys(&self.pool, &self.opts.schema).await?;
        Ok(mapper::map_foreign_keys(raw))
    }
}
