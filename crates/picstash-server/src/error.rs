//! Error types and HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use picstash_core::{DenyReason, PipelineError};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Shown when a request carries no usable bearer token
pub const MSG_NO_TOKEN: &str = "Access denied. No token provided. Please login to continue";
/// Shown when the token fails verification
pub const MSG_INVALID_TOKEN: &str = "Access denied. Invalid or expired token. Please login again";
/// Shown when the admin role is missing
pub const MSG_ADMIN_REQUIRED: &str = "Access denied! Admin rights required.";
/// Shown when a non-owner tries to delete an image
pub const MSG_NOT_OWNER: &str = "You are not authorized to delete this image";
/// Shown when the upload has no file
pub const MSG_FILE_REQUIRED: &str = "File is required. Please upload an image";
/// Shown when the image id does not resolve
pub const MSG_IMAGE_NOT_FOUND: &str = "Image not found";

/// API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthenticated,
    InvalidCredential,
    Forbidden,
    NotFound,
    MissingFile,
    InvalidRequest,
    EntityTooLarge,
    StorageUploadFailed,
    StorageDeleteFailed,
    PersistenceError,
    InternalError,
}

impl ErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::InvalidCredential => "InvalidCredential",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::MissingFile => "MissingFile",
            Self::InvalidRequest => "InvalidRequest",
            Self::EntityTooLarge => "EntityTooLarge",
            Self::StorageUploadFailed => "StorageUploadFailed",
            Self::StorageDeleteFailed => "StorageDeleteFailed",
            Self::PersistenceError => "PersistenceError",
            Self::InternalError => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MissingFile | Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::EntityTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StorageUploadFailed
            | Self::StorageDeleteFailed
            | Self::PersistenceError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The operation a request was performing, used to pick the generic
/// message for server-side failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    List,
    Delete,
}

impl Operation {
    /// Client-facing message for a 500 during this operation
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Upload => "Something went wrong! Please try again",
            Self::List => "Something went wrong while fetching! Please try again",
            Self::Delete => "Something went wrong while deleting the image! Please try again",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::List => f.write_str("list"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// Client-visible error with a fixed message
    #[error("{code:?}: {message}")]
    Api { code: ErrorCode, message: String },

    /// Server-side pipeline failure; details stay in the logs
    #[error("{operation} failed: {source}")]
    Failed {
        code: ErrorCode,
        operation: Operation,
        #[source]
        source: PipelineError,
    },
}

impl ApiError {
    /// Create a client-visible error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Create an internal error for `operation`, logging `detail`
    pub fn internal(operation: Operation, detail: impl fmt::Display) -> Self {
        tracing::error!(operation = %operation, error = %detail, "Internal error");
        Self::new(ErrorCode::InternalError, operation.failure_message())
    }

    /// Map an authorization denial
    pub fn denied(reason: &DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => Self::new(ErrorCode::Unauthenticated, MSG_NO_TOKEN),
            DenyReason::RoleRequired(_) => Self::new(ErrorCode::Forbidden, MSG_ADMIN_REQUIRED),
            DenyReason::NotOwner => Self::new(ErrorCode::Forbidden, MSG_NOT_OWNER),
        }
    }

    /// Map a pipeline error raised during `operation`
    pub fn pipeline(operation: Operation, err: PipelineError) -> Self {
        let code = match &err {
            PipelineError::MissingFile => return Self::new(ErrorCode::MissingFile, MSG_FILE_REQUIRED),
            PipelineError::NotFound(_) => return Self::new(ErrorCode::NotFound, MSG_IMAGE_NOT_FOUND),
            PipelineError::Denied(reason) => return Self::denied(reason),
            PipelineError::StorageUploadFailed(_) => ErrorCode::StorageUploadFailed,
            PipelineError::StorageDeleteFailed(_) => ErrorCode::StorageDeleteFailed,
            PipelineError::Persistence(_) => ErrorCode::PersistenceError,
        };

        Self::Failed {
            code,
            operation,
            source: err,
        }
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } | Self::Failed { code, .. } => *code,
        }
    }

    /// Message sent to the client
    pub fn client_message(&self) -> &str {
        match self {
            Self::Api { message, .. } => message,
            Self::Failed { operation, .. } => operation.failure_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();

        if let Self::Failed { operation, source, .. } = &self {
            tracing::error!(
                operation = %operation,
                code = code.as_str(),
                error = %source,
                "Request failed"
            );
        }

        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));

        (code.status_code(), [("x-error-code", code.as_str())], body).into_response()
    }
}
