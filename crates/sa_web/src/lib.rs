use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analyze", post(handlers::analyze))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("👋 Shutting down");
}

/// Serve until Ctrl-C, letting in-flight requests finish.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> sa_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub mod prelude {
    pub use super::{create_app, serve, ApiError, AppState};
    pub use sa_core::{Error, FinalReport, Result};
}
