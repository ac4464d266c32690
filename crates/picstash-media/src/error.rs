//! Error types for the picstash-media crate

use thiserror::Error;

/// Result type alias using `MediaError`
pub type Result<T> = std::result::Result<T, MediaError>;

/// Errors that can occur while talking to a media store
#[derive(Error, Debug)]
pub enum MediaError {
    /// Upload rejected or failed remotely
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Destroy rejected or failed remotely
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// HTTP error
    #[error("http error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// IO error (reading the local file)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

// Timeouts are mapped by the client, which knows its configured limit
impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            MediaError::Connection(err.to_string())
        } else {
            MediaError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::Deserialization(err.to_string())
    }
}
