use anyhow::{Context, Result};
use dbseed_core::{LengthLimit, SafeType};
use dbseed_introspect::{CatalogOptions, PostgresCatalog, SchemaCatalog};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;

const SCHEMA: &str = "dbseed_it_catalog";

const FIXTURE: &str = r#"
DROP SCHEMA IF EXISTS dbseed_it_catalog CASCADE;
CREATE SCHEMA dbseed_it_catalog;
CREATE TABLE dbseed_it_catalog.customer (
  id serial PRIMARY KEY,
  name varchar(40) NOT NULL,
  email text,
  photo bytea,
  balance numeric(10,2),
  created timestamptz
);
COMMENT ON COLUMN dbseed_it_catalog.customer.email IS 'Contact e-mail';
CREATE TABLE dbseed_it_catalog.orders (
  order_no bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
  customer_id int REFERENCES dbseed_it_catalog.customer(id),
  quantity smallint NOT NULL,
  price numeric(8,2) NOT NULL,
  total numeric GENERATED ALWAYS AS (quantity * price) STORED
);
CREATE TABLE dbseed_it_catalog.audit_log (
  message text
)
"#;

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn setup(db_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(db_url)
        .await
        .context("connecting to Postgres")?;

    for statement in FIXTURE.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(&pool)
            .await
            .with_context(|| format!("executing fixture statement: {sql}"))?;
    }
    Ok(pool)
}

#[tokio::test]
async fn describes_tables_keys_and_foreign_keys() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL to run Postgres tests");
        return Ok(());
    };
    let pool = setup(&db_url).await?;
    let catalog = PostgresCatalog::new(pool, CatalogOptions::for_schema(SCHEMA));

    assert_eq!(catalog.engine(), "postgres");
    assert_eq!(
        catalog.list_tables().await?,
        vec!["audit_log", "customer", "orders"]
    );

    let customer = catalog.describe_table("customer").await;
    let names: Vec<&str> = customer.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "email", "balance", "created"]);
    assert_eq!(customer.primary_key, "id");

    let id = customer.column("id").context("id column")?;
    assert!(id.is_identity, "serial columns count as identity");
    let name = customer.column("name").context("name column")?;
    assert_eq!(name.data_type, SafeType::VarChar);
    assert_eq!(name.max_length, Some(LengthLimit::Bounded(40)));
    assert!(!name.is_nullable);
    let email = customer.column("email").context("email column")?;
    assert_eq!(email.max_length, Some(LengthLimit::Unbounded));
    assert_eq!(email.description.as_deref(), Some("Contact e-mail"));
    let balance = customer.column("balance").context("balance column")?;
    assert_eq!(balance.numeric_precision, Some(10));
    assert_eq!(balance.numeric_scale, Some(2));
    let created = customer.column("created").context("created column")?;
    assert_eq!(created.data_type, SafeType::TimestampTz);

    let orders = catalog.describe_table("orders").await;
    assert_eq!(orders.primary_key, "order_no");
    assert!(orders.column("order_no").is_some_and(|c| c.is_identity));
    assert!(orders.column("total").is_some_and(|c| c.is_computed));

    let audit = catalog.describe_table("audit_log").await;
    assert_eq!(audit.primary_key, "id", "missing primary key falls back to the default");

    let fk_map = catalog.build_foreign_key_map().await?;
    assert_eq!(fk_map.len(), 1);
    assert_eq!(fk_map.parent_of("orders", "customer_id"), Some("customer"));

    Ok(())
}

#[tokio::test]
async fn unknown_table_comes_back_empty() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL to run Postgres tests");
        return Ok(());
    };
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .context("connecting to Postgres")?;
    let catalog = PostgresCatalog::new(pool, CatalogOptions::for_schema("dbseed_it_missing"));

    assert!(catalog.list_tables().await?.is_empty());
    assert!(catalog.describe_table("ghost").await.is_empty());
    assert!(catalog.build_foreign_key_map().await?.is_empty());
    Ok(())
}
