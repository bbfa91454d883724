use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::reference::DEFAULT_SAMPLE_CAP;

pub const DEFAULT_ROWS: usize = 15;
pub const DEFAULT_TEXT_CEILING: usize = 100;
const REASON_LIMIT: usize = 160;

/// Framework and migration bookkeeping tables, matched by substring.
pub const DEFAULT_SKIP_TABLES: &[&str] = &[
    "_sqlx_migrations",
    "schema_migrations",
    "__EFMigrationsHistory",
    "__diesel_schema_migrations",
    "spatial_ref_sys",
];

/// Audit columns usually filled by triggers or the application; matched by name, ignoring case.
pub const DEFAULT_SKIP_COLUMNS: &[&str] =
    &["created_at", "updated_at", "created_by", "updated_by"];

/// Options for a seeding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedOptions {
    /// Rows synthesized per table.
    pub rows: usize,
    /// RNG seed; drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Tables whose name contains any of these are never populated.
    pub skip_tables: Vec<String>,
    /// Columns with these names (case-insensitive) are never populated.
    pub skip_columns: Vec<String>,
    /// Cap on primary keys cached per parent table.
    pub reference_sample: usize,
    /// Length budget for unbounded text columns.
    pub text_ceiling: usize,
    /// Reference instant for temporal values; defaults to the wall clock.
    pub now: Option<NaiveDateTime>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            seed: None,
            skip_tables: DEFAULT_SKIP_TABLES.iter().map(|s| s.to_string()).collect(),
            skip_columns: DEFAULT_SKIP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            reference_sample: DEFAULT_SAMPLE_CAP,
            text_ceiling: DEFAULT_TEXT_CEILING,
            now: None,
        }
    }
}

impl SeedOptions {
    pub fn skips_table(&self, table: &str) -> bool {
        self.skip_tables
            .iter()
            .any(|pattern| !pattern.is_empty() && table.contains(pattern.as_str()))
    }

    pub fn skips_column(&self, column: &str) -> bool {
        self.skip_columns
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column))
    }
}

/// Result of processing one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Populated { rows: usize },
    Failed { reason: String },
    Skipped { reason: String },
}

impl TableOutcome {
    pub fn failed(reason: impl AsRef<str>) -> Self {
        Self::Failed {
            reason: shorten_reason(reason.as_ref()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Populated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

/// Summary of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub tables: Vec<TableReport>,
    /// Tables emitted out of dependency order because of FK cycles.
    pub cycle_members: Vec<String>,
    pub rule_usage: BTreeMap<String, usize>,
    pub dangling_references: usize,
    pub constraints_suspended: bool,
    pub constraints_restored: bool,
}

impl RunReport {
    pub fn populated(&self) -> usize {
        self.count(TableOutcome::is_populated)
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, TableOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, TableOutcome::Skipped { .. }))
    }

    pub fn rows_inserted(&self) -> usize {
        self.tables
            .iter()
            .map(|report| match report.outcome {
                TableOutcome::Populated { rows } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|report| report.table == table)
            .map(|report| &report.outcome)
    }

    fn count(&self, pred: impl Fn(&TableOutcome) -> bool) -> usize {
        self.tables.iter().filter(|report| pred(&report.outcome)).count()
    }
}

/// First line of an error message, cut to a log-friendly length.
pub fn shorten_reason(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("").trim();
    match first_line.char_indices().nth(REASON_LIMIT) {
        Some((idx, _)) => format!("{}...", &first_line[..idx]),
        None => first_line.to_string(),
    }
}
