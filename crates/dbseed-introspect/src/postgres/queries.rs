use sqlx::PgPool;

use dbseed_core::{Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

pub async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select c.relname::text
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p')
          and not c.relispartition
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_identity: bool,
    pub is_generated: bool,
    pub character_max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub comment: Option<String>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attname::text as name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
          t.typname::text as udt_name,
          (not a.attnotnull) as is_nullable,
          case when a.attgenerated = '' then pg_get_expr(ad.adbin, ad.adrelid) end as "default",
          (a.attidentity <> '') as is_identity,
          (a.attgenerated <> '') as is_generated,
          ic.character_maximum_length::int4 as character_max_length,
          ic.numeric_precision::int4 as numeric_precision,
          ic.numeric_scale::int4 as numeric_scale,
          pg_catalog.col_description(a.attrelid, a.attnum) as comment
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        left join information_schema.columns ic
          on ic.table_schema = n.nspname and ic.table_name = c.relname and ic.column_name = a.attname
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn primary_key_column(pool: &PgPool, schema: &str, table: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select a.attname::text
        from pg_index i
        join pg_class c on c.oid = i.indrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_attribute a on a.attrelid = c.oid and a.attnum = any(i.indkey)
        where n.nspname = $1
          and c.relname = $2
          and i.indisprimary
        order by array_position(i.indkey::int2[], a.attnum)
        limit 1
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_optional(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawForeignKey {
    pub child_table: String,
    pub child_column: String,
    pub parent_table: String,
}

pub async fn list_foreign_keys(pool: &PgPool, schema: &str) -> Result<Vec<RawForeignKey>> {
    sqlx::query_as::<_, RawForeignKey>(
        r#"
        select
          cl.relname::text as child_table,
          a.attname::text as child_column,
          pc.relname::text as parent_table
        from pg_constraint con
        join pg_class cl on cl.oid = con.conrelid
        join pg_namespace n on n.oid = cl.relnamespace
        join pg_class pc on pc.oid = con.confrelid
        cross join lateral unnest(con.conkey) as k(attnum)
        join pg_attribute a on a.attrelid = con.conrelid and a.attnum = k.attnum
        where con.contype = 'f'
          and n.nspname = $1
        order by cl.relname, a.attname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}
