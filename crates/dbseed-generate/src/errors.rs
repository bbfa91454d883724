use thiserror::Error;

/// Errors emitted while preparing or running a seeding run.
///
/// Per-table insert failures are not errors; they are reported as
/// [`crate::TableOutcome::Failed`].
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Core(#[from] dbseed_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid override: {0}")]
    InvalidOverride(String),
}
