//! Error types for the picstash-records crate

use thiserror::Error;

/// Result type alias using `RecordError`
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors that can occur in record storage operations
#[derive(Error, Debug)]
pub enum RecordError {
    /// A record with the same public id already exists
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for RecordError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => RecordError::Duplicate(db.message().to_string()),
            _ => RecordError::Database(err.to_string()),
        }
    }
}
