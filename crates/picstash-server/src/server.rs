//! Server startup and lifecycle

use crate::{routes, AppState, ServerConfig};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Connect the stores, bind, and serve until `shutdown_signal` resolves
pub async fn run_server_with_shutdown(
    config: ServerConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let state = Arc::new(AppState::new(config).await?);
    let app = routes::create_router(state);

    info!("🚀 Picstash listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("👋 Picstash shutdown complete");

    Ok(())
}
