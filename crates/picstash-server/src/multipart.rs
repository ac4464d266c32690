//! Multipart image intake
//!
//! Streams the `image` file field of an upload request into the upload
//! directory. Text fields are ignored. Anything written by a request that
//! ends in an error is removed before the error is returned.

use crate::error::{ApiError, ErrorCode, Operation};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Name of the form field carrying the image
pub const IMAGE_FIELD: &str = "image";

pub const MSG_UNEXPECTED_FIELD: &str = "Unexpected field";
pub const MSG_NOT_AN_IMAGE: &str = "Not an image! Please upload only images.";
pub const MSG_FILE_TOO_LARGE: &str = "File too large";
pub const MSG_MALFORMED: &str = "Malformed multipart body";

/// An image written to the upload directory
#[derive(Debug)]
pub struct TempUpload {
    /// Location on disk
    pub path: PathBuf,
    /// File name sent by the client
    pub file_name: String,
    /// Declared content type
    pub content_type: String,
    /// Bytes written
    pub size: usize,
}

impl TempUpload {
    /// Remove the file; failures are logged only
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(error = %e, path = %self.path.display(), "Failed to remove temp upload file");
        }
    }
}

/// Read the multipart body, returning the accepted image if one was sent
pub async fn receive_image(
    multipart: &mut Multipart,
    upload_dir: &Path,
    max_size: usize,
) -> Result<Option<TempUpload>, ApiError> {
    let mut accepted = None;

    match read_fields(multipart, upload_dir, max_size, &mut accepted).await {
        Ok(()) => Ok(accepted),
        Err(e) => {
            if let Some(upload) = accepted {
                upload.discard().await;
            }
            Err(e)
        }
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    upload_dir: &Path,
    max_size: usize,
    accepted: &mut Option<TempUpload>,
) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        // Text fields, and file inputs left empty by the browser
        if field.file_name().map_or(true, str::is_empty) {
            continue;
        }

        if field.name() != Some(IMAGE_FIELD) || accepted.is_some() {
            return Err(ApiError::new(ErrorCode::InvalidRequest, MSG_UNEXPECTED_FIELD));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::new(ErrorCode::InvalidRequest, MSG_NOT_AN_IMAGE));
        }

        *accepted = Some(write_field(field, content_type, upload_dir, max_size).await?);
    }

    Ok(())
}

async fn write_field(
    mut field: Field<'_>,
    content_type: String,
    upload_dir: &Path,
    max_size: usize,
) -> Result<TempUpload, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let path = upload_dir.join(temp_file_name(&file_name));

    let mut file = File::create(&path).await.map_err(|e| {
        ApiError::internal(
            Operation::Upload,
            format!("creating {}: {}", path.display(), e),
        )
    })?;

    let mut size = 0usize;
    let written: Result<(), ApiError> = async {
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len();
            if size > max_size {
                return Err(ApiError::new(ErrorCode::EntityTooLarge, MSG_FILE_TOO_LARGE));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::internal(Operation::Upload, e))?;
        }
        file.flush()
            .await
            .map_err(|e| ApiError::internal(Operation::Upload, e))
    }
    .await;

    let upload = TempUpload {
        path,
        file_name,
        content_type,
        size,
    };

    match written {
        Ok(()) => {
            debug!(path = %upload.path.display(), size, "Received image");
            Ok(upload)
        }
        Err(e) => {
            drop(file);
            upload.discard().await;
            Err(e)
        }
    }
}

/// `<unix-millis>-<uuid><ext>`, keeping the client's extension when it is plain
pub fn temp_file_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    format!(
        "{}-{}{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        ext
    )
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(ErrorCode::EntityTooLarge, MSG_FILE_TOO_LARGE)
    } else {
        debug!(error = %e.body_text(), "Rejected multipart body");
        ApiError::new(ErrorCode::InvalidRequest, MSG_MALFORMED)
    }
}
