//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use picstash_core::Role;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin_only = || axum_middleware::from_fn_with_state(Role::Admin, middleware::require_role);

    let images = Router::new()
        .route("/upload", post(handlers::upload_image).route_layer(admin_only()))
        .route("/get", get(handlers::list_images))
        .route("/{id}", delete(handlers::delete_image).route_layer(admin_only()));

    let home = Router::new().route("/welcome", get(handlers::home_welcome));

    let admin = Router::new()
        .route("/welcome", get(handlers::admin_welcome))
        .route_layer(admin_only());

    // Everything here requires a verified credential
    let protected = Router::new()
        .nest("/images", images)
        .nest("/home", home)
        .nest("/admin", admin)
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ));

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware));

    if state.config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);
        router = router.layer(cors);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .with_state(state)
}
