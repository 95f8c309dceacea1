use thiserror::Error;

/// Main error type for MangoDesk operations
#[derive(Error, Debug)]
pub enum MangoDeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied input that cannot be processed
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Only .txt and .docx files are allowed (got {0})")]
    UnsupportedFileType(String),

    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("{0}")]
    Llm(String),

    #[error("{0}")]
    Email(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration {id} checksum mismatch: expected {expected}, found {actual}")]
    MigrationChecksum {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MangoDeskError {
    /// True when the failure was caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MangoDeskError::Validation(_)
                | MangoDeskError::NotFound(_)
                | MangoDeskError::UnsupportedFileType(_)
                | MangoDeskError::PayloadTooLarge { .. }
                | MangoDeskError::Document(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MangoDeskError>;
