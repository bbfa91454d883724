use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use dbseed_core::{ColumnSchema, Error, GeneratedValue, Result, SafeType};

use crate::target::{RowBatch, SeedTarget};

/// Postgres caps a statement at 65535 bind parameters.
const BIND_LIMIT: usize = 65_535;

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

/// Writes seeded rows into one Postgres schema.
#[derive(Debug, Clone)]
pub struct PostgresTarget {
    pool: PgPool,
    schema: String,
}

impl PostgresTarget {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    async fn alter_triggers(&self, tables: &[String], action: &'static str) -> Result<()> {
        let mut failures = Vec::new();
        for table in tables {
            let sql = format!(
                "ALTER TABLE {} {action} TRIGGER ALL",
                qualified(&self.schema, table)
            );
            match sqlx::query(&sql).execute(&self.pool).await {
                Ok(_) => debug!(event = "triggers_altered", table = %table, action),
                Err(err) => {
                    warn!(event = "triggers_alter_failed", table = %table, action, error = %err);
                    failures.push(format!("{table}: {err}"));
                }
            }
        }

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(Error::Db(format!(
                "{action} TRIGGER ALL failed on {} of {} tables; first: {first}",
                failures.len(),
                tables.len()
            ))),
        }
    }
}

#[async_trait]
impl SeedTarget for PostgresTarget {
    async fn suspend_constraints(&mut self, tables: &[String]) -> Result<()> {
        self.alter_triggers(tables, "DISABLE").await
    }

    async fn restore_constraints(&mut self, tables: &[String]) -> Result<()> {
        self.alter_triggers(tables, "ENABLE").await
    }

    async fn insert_rows(&mut self, batch: &RowBatch) -> Result<Vec<GeneratedValue>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut keys = Vec::with_capacity(batch.len());
        let prefix = insert_prefix(&self.schema, batch);

        for chunk in batch.rows.chunks(chunk_size(batch.columns.len())) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut row, values| {
                for value in values {
                    push_value(&mut row, value);
                }
            });

            match &batch.returning {
                Some(key) => {
                    builder.push(" RETURNING ");
                    builder.push(key_expr(key));
                    let rows = builder.build().fetch_all(&mut *tx).await.map_err(db_error)?;
                    for row in &rows {
                        keys.push(decode_key(row, key)?);
                    }
                }
                None => {
                    builder.build().execute(&mut *tx).await.map_err(db_error)?;
                }
            }
        }

        tx.commit().await.map_err(db_error)?;
        Ok(keys)
    }

    /// Plain `SELECT`; MVCC reads never wait on the writer's locks.
    async fn sample_keys(
        &mut self,
        table: &str,
        key: &ColumnSchema,
        limit: usize,
    ) -> Result<Vec<GeneratedValue>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IS NOT NULL LIMIT $1",
            key_expr(key),
            qualified(&self.schema, table),
            quote_ident(&key.name)
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(|row| decode_key(row, key)).collect()
    }
}

fn push_value(row: &mut Separated<'_, '_, Postgres, &'static str>, value: &GeneratedValue) {
    match value {
        GeneratedValue::Null => {
            row.push("NULL");
        }
        GeneratedValue::Bool(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Int(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Float(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Decimal(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Text(v) => {
            row.push_bind(v.clone());
        }
        GeneratedValue::Uuid(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Date(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Time(v) => {
            row.push_bind(*v);
        }
        GeneratedValue::Timestamp(v) => {
            row.push_bind(*v);
        }
    }
}

fn decode_key(row: &PgRow, key: &ColumnSchema) -> Result<GeneratedValue> {
    let value = match key.data_type {
        SafeType::Bit => row.try_get::<Option<bool>, _>(0).map(|v| v.map(GeneratedValue::Bool)),
        SafeType::TinyInt | SafeType::SmallInt => row
            .try_get::<Option<i16>, _>(0)
            .map(|v| v.map(|n| GeneratedValue::Int(n.into()))),
        SafeType::Int => row
            .try_get::<Option<i32>, _>(0)
            .map(|v| v.map(|n| GeneratedValue::Int(n.into()))),
        SafeType::BigInt => row.try_get::<Option<i64>, _>(0).map(|v| v.map(GeneratedValue::Int)),
        SafeType::Decimal | SafeType::Money => row
            .try_get::<Option<Decimal>, _>(0)
            .map(|v| v.map(GeneratedValue::Decimal)),
        SafeType::Real => row
            .try_get::<Option<f32>, _>(0)
            .map(|v| v.map(|n| GeneratedValue::Float(n.into()))),
        SafeType::Double => row.try_get::<Option<f64>, _>(0).map(|v| v.map(GeneratedValue::Float)),
        SafeType::Date => row
            .try_get::<Option<NaiveDate>, _>(0)
            .map(|v| v.map(GeneratedValue::Date)),
        SafeType::Time => row
            .try_get::<Option<NaiveTime>, _>(0)
            .map(|v| v.map(GeneratedValue::Time)),
        SafeType::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(0)
            .map(|v| v.map(GeneratedValue::Timestamp)),
        SafeType::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(0)
            .map(|v| v.map(|at| GeneratedValue::Timestamp(at.naive_utc()))),
        SafeType::Char | SafeType::VarChar | SafeType::Text => row
            .try_get::<Option<String>, _>(0)
            .map(|v| v.map(GeneratedValue::Text)),
        SafeType::Uuid => row.try_get::<Option<Uuid>, _>(0).map(|v| v.map(GeneratedValue::Uuid)),
    };
    value
        .map(|v| v.unwrap_or(GeneratedValue::Null))
        .map_err(db_error)
}

fn insert_prefix(schema: &str, batch: &RowBatch) -> String {
    let columns: Vec<String> = batch.columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "INSERT INTO {} ({}) ",
        qualified(schema, &batch.table),
        columns.join(", ")
    )
}

fn chunk_size(columns: usize) -> usize {
    (BIND_LIMIT / columns.max(1)).max(1)
}

/// `money` has no direct decoder; read it back as `numeric`.
fn key_expr(key: &ColumnSchema) -> String {
    match key.data_type {
        SafeType::Money => format!("{}::numeric", quote_ident(&key.name)),
        _ => quote_ident(&key.name),
    }
}

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
