//! Error types for the picstash-core crate

use crate::policy::DenyReason;
use picstash_media::MediaError;
use picstash_records::RecordError;
use thiserror::Error;

/// Result type alias using `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by the image pipelines
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Upload request carried no file
    #[error("file is required")]
    MissingFile,

    /// Image record not found
    #[error("image not found: {0}")]
    NotFound(String),

    /// Authorization refused
    #[error("access denied: {0}")]
    Denied(DenyReason),

    /// Media store rejected or failed the upload
    #[error("storage upload failed: {0}")]
    StorageUploadFailed(#[source] MediaError),

    /// Media store rejected or failed the destroy
    #[error("storage delete failed: {0}")]
    StorageDeleteFailed(#[source] MediaError),

    /// Record store failure
    #[error("persistence error: {0}")]
    Persistence(#[from] RecordError),
}

impl From<DenyReason> for PipelineError {
    fn from(reason: DenyReason) -> Self {
        PipelineError::Denied(reason)
    }
}
