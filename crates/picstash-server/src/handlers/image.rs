//! Image handlers (upload, list, delete)

use crate::error::{ApiError, Operation};
use crate::multipart::receive_image;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use picstash_core::{Identity, ListRequest, ListResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// POST /images/upload
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let upload = match multipart {
        Ok(mut multipart) => {
            receive_image(
                &mut multipart,
                &state.config.upload_dir,
                state.config.max_upload_size,
            )
            .await?
        }
        // Not a multipart body, so there is no file
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Upload without multipart body");
            None
        }
    };

    let image = state
        .images
        .upload(&identity, upload.as_ref().map(|u| u.path.as_path()))
        .await
        .map_err(|e| ApiError::pipeline(Operation::Upload, e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Image uploaded successfully",
            "image": image,
        })),
    )
        .into_response())
}

/// Query parameters for listing; kept as strings so bad values fall back to defaults
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Serialize)]
struct ListImagesResponse {
    success: bool,
    #[serde(flatten)]
    result: ListResult,
}

/// GET /images/get
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<ListImagesParams>,
) -> Result<Response, ApiError> {
    let request = ListRequest::parse(
        params.page.as_deref(),
        params.limit.as_deref(),
        params.sort_by.as_deref(),
        params.sort_order.as_deref(),
        state.config.max_page_size,
    );

    let result = state
        .images
        .list(&identity, request)
        .await
        .map_err(|e| ApiError::pipeline(Operation::List, e))?;

    Ok(Json(ListImagesResponse {
        success: true,
        result,
    })
    .into_response())
}

/// DELETE /images/{id}
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state
        .images
        .delete(&identity, &id)
        .await
        .map_err(|e| ApiError::pipeline(Operation::Delete, e))?;

    Ok(Json(json!({
        "success": true,
        "message": "Image deleted successfully",
    }))
    .into_response())
}
