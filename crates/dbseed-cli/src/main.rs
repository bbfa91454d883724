mod config;
mod logging;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use config::{ResolvedConnection, Settings};
use dbseed_core::{Error as CoreError, redact_connection_string};
use dbseed_generate::{
    OverrideMap, PostgresTarget, RunPlan, RunReport, SeedEngine, SeedError, TableOutcome,
    TableReport,
};
use dbseed_introspect::{CatalogOptions, PostgresCatalog};
use logging::init_logging;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("seed error: {0}")]
    Seed(#[from] SeedError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "dbseed", version, about = "Populate a relational schema with synthetic rows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and insert rows into every table of the schema.
    Seed(SeedArgs),
    /// Print the table order and cycle report without writing anything.
    Plan(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// TOML configuration file (defaults to ./dbseed.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Database connection string.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// Schema to populate.
    #[arg(long, value_name = "NAME")]
    schema: Option<String>,
    /// Also write NDJSON log events to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SeedArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Rows to generate per table.
    #[arg(long)]
    rows: Option<usize>,
    /// Seed for reproducible values.
    #[arg(long)]
    seed: Option<u64>,
    /// JSON file with per-column provider directives.
    #[arg(long, value_name = "PATH")]
    overrides: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Seed(args) => run_seed(args).await,
        Command::Plan(args) => run_plan(args).await,
    }
}

async fn run_seed(args: SeedArgs) -> Result<(), CliError> {
    let SeedArgs {
        common,
        rows,
        seed,
        overrides,
    } = args;
    init_logging(common.log_file.as_deref())?;

    let mut settings = load_settings(&common)?;
    if let Some(rows) = rows {
        settings.rows = rows;
    }
    if seed.is_some() {
        settings.seed = seed;
    }
    if overrides.is_some() {
        settings.overrides = overrides;
    }

    let override_map = load_overrides(&settings)?;

    let started = Instant::now();
    let pool = connect(&settings, common.conn.as_deref()).await?;
    let catalog = PostgresCatalog::new(pool.clone(), CatalogOptions::for_schema(&settings.schema));
    let mut target = PostgresTarget::new(pool, settings.schema.clone());
    let engine = SeedEngine::new(settings.seed_options(), override_map);

    let report = engine.run(&catalog, &mut target).await?;
    print_report(&report);

    tracing::info!(
        event = "seed_finished",
        populated = report.populated(),
        failed = report.failed(),
        duration_ms = started.elapsed().as_millis() as u64
    );
    Ok(())
}

async fn run_plan(args: CommonArgs) -> Result<(), CliError> {
    init_logging(args.log_file.as_deref())?;
    let settings = load_settings(&args)?;

    let pool = connect(&settings, args.conn.as_deref()).await?;
    let catalog = PostgresCatalog::new(pool, CatalogOptions::for_schema(&settings.schema));
    let engine = SeedEngine::new(settings.seed_options(), load_overrides(&settings)?);
    let plan = engine.plan(&catalog).await?;
    print_plan(&plan);
    Ok(())
}

fn load_settings(common: &CommonArgs) -> Result<Settings, CliError> {
    let mut settings = Settings::load(common.config.as_deref())?;
    if let Some(schema) = &common.schema {
        settings.schema = schema.clone();
    }
    Ok(settings)
}

fn load_overrides(settings: &Settings) -> Result<OverrideMap, CliError> {
    Ok(match &settings.overrides {
        Some(path) => OverrideMap::load(path)?,
        None => OverrideMap::new(),
    })
}

/// Opens the pool before anything is written; a failure here leaves the database untouched.
async fn connect(settings: &Settings, conn_flag: Option<&str>) -> Result<PgPool, CliError> {
    let ResolvedConnection { options, display } = settings.resolve_connection(conn_flag)?;
    let redacted = redact_connection_string(&display);
    tracing::info!(
        event = "connecting",
        connection = %redacted.redacted,
        schema = %settings.schema
    );

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(|err| CoreError::Connection(format!("{}: {err}", redacted.redacted)))?;
    tracing::info!(event = "connected");
    Ok(pool)
}

fn print_report(report: &RunReport) {
    for table in &report.tables {
        println!("{}", outcome_line(table));
    }
    if !report.cycle_members.is_empty() {
        println!("cycle: {}", report.cycle_members.join(", "));
    }
    println!(
        "done: {} populated, {} failed, {} skipped, {} rows (seed {})",
        report.populated(),
        report.failed(),
        report.skipped(),
        report.rows_inserted(),
        report.seed
    );
    if report.constraints_suspended && !report.constraints_restored {
        println!("warning: constraints could not be fully restored; check the log");
    }
}

fn print_plan(plan: &RunPlan) {
    for (index, table) in plan.order.order.iter().enumerate() {
        println!("{:>3}. {table}", index + 1);
    }
    if !plan.order.forced.is_empty() {
        println!("cycle: {}", plan.order.forced.join(", "));
    }
    for table in &plan.skipped {
        println!("skip {table}");
    }
}

fn outcome_line(report: &TableReport) -> String {
    match &report.outcome {
        TableOutcome::Populated { rows } => format!("ok  {}: {rows} rows", report.table),
        TableOutcome::Failed { reason } => format!("err {}: {reason}", report.table),
        TableOutcome::Skipped { reason } => format!("skip {}: {reason}", report.table),
    }
}
