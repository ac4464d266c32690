//! Welcome and liveness handlers

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use picstash_core::Identity;
use serde_json::{json, Value};

/// GET /home/welcome - any authenticated caller
pub async fn home_welcome(Extension(identity): Extension<Identity>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to the home page",
        "user": {
            "_id": identity.user_id,
            "username": identity.username,
            "role": identity.role,
        },
    }))
}

/// GET /admin/welcome - admins only
pub async fn admin_welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the admin page" }))
}

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
