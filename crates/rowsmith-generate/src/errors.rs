use thiserror::Error;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Malformed or self-contradictory rules. Aborts the affected table.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Table structure or foreign keys could not be discovered.
    #[error("schema unavailable: {0}")]
    SchemaUnavailable(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<rowsmith_core::Error> for GenerationError {
    fn from(err: rowsmith_core::Error) -> Self {
        match err {
            rowsmith_core::Error::SchemaUnavailable(message)
            | rowsmith_core::Error::InvalidSchema(message) => {
                GenerationError::SchemaUnavailable(message)
            }
            rowsmith_core::Error::Configuration(message) => {
                GenerationError::Configuration(message)
            }
            rowsmith_core::Error::Db(message) | rowsmith_core::Error::Other(message) => {
                GenerationError::Persistence(message)
            }
        }
    }
}
