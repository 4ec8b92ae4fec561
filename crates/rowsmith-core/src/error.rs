use thiserror::Error;

/// Core error type shared across rowsmith crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
    /// Table structure could not be obtained or is empty.
    #[error("schema unavailable: {0}")]
    SchemaUnavailable(String),
    /// The schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Table rules contradict themselves or the schema.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by rowsmith crates.
pub type Result<T> = std::result::Result<T, Error>;
