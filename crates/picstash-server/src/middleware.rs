//! HTTP middleware for authentication, role gating and request tracing

use crate::auth::{claims_to_identity, extract_bearer_token, validate_token};
use crate::error::{ApiError, ErrorCode, MSG_NO_TOKEN};
use crate::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use picstash_core::{authorize, Identity, Requirement, Role};
use std::sync::Arc;

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authentication middleware
///
/// Verifies the bearer token and stores the resulting [`Identity`] in the
/// request extensions. Handlers behind this layer can rely on it being there.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthenticated, MSG_NO_TOKEN))?;

    let secret = state
        .config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| {
            tracing::error!("JWT secret not configured");
            ApiError::new(ErrorCode::InternalError, "Authentication is not configured")
        })?;

    let identity = claims_to_identity(validate_token(token, secret)?);
    tracing::debug!(user_id = %identity.user_id, role = %identity.role, "Authenticated");

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Role gate; must run after [`auth_middleware`]
pub async fn require_role(
    State(role): State<Role>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(
        request.extensions().get::<Identity>(),
        &[Requirement::Role(role)],
    )
    .into_result()
    .map_err(|reason| ApiError::denied(&reason))?;

    Ok(next.run(request).await)
}

/// Request ID middleware - adds x-request-id header
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Request ID extension
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issue_token;
    use crate::config::ServerConfig;
    use axum::{http::StatusCode, middleware as axum_middleware, routing::get, Extension, Router};
    use picstash_media::{FlexibleMediaStore, MemoryMediaStore};
    use picstash_records::{FlexibleRecordStore, MemoryRecordStore};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-secret";

    fn state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = ServerConfig {
            jwt_secret: Some(SECRET.to_string()),
            upload_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        Arc::new(
            AppState::with_stores(
                config,
                FlexibleMediaStore::Memory(MemoryMediaStore::new()),
                FlexibleRecordStore::Memory(MemoryRecordStore::new()),
            )
            .unwrap(),
        )
    }

    async fn whoami(Extension(identity): Extension<Identity>) -> String {
        identity.username
    }

    fn app(state: Arc<AppState>) -> Router {
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(axum_middleware::from_fn_with_state(Role::Admin, require_role));

        Router::new()
            .route("/me", get(whoami))
            .merge(admin)
            .route_layer(axum_middleware::from_fn_with_state(
                Arc::clone(&state),
                auth_middleware,
            ))
            .layer(axum_middleware::from_fn(request_id_middleware))
    }

    fn request(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn token(role: Role) -> String {
        let identity = Identity::new("u1", "alice", role);
        issue_token(&identity, SECRET, chrono::Duration::minutes(5)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(state(&dir)).oneshot(request("/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-error-code"], "Unauthenticated");
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(state(&dir))
            .oneshot(request("/me", Some("not-a-jwt")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["x-error-code"], "InvalidCredential");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(state(&dir))
            .oneshot(request("/me", Some(&token(Role::User))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_gate() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);

        let response = app(Arc::clone(&state))
            .oneshot(request("/admin", Some(&token(Role::User))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app(state)
            .oneshot(request("/admin", Some(&token(Role::Admin))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
