use thiserror::Error;

/// Core error type shared across dbseed crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The database could not be reached or the session could not be opened.
    #[error("connection error: {0}")]
    Connection(String),
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by dbseed crates.
pub type Result<T> = std::result::Result<T, Error>;
