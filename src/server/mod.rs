//! HTTP surface: upload endpoints, health check and optional front-end hosting.

pub mod form;
pub mod handlers;

use crate::config::ServerConfig;
use crate::pipeline::BatchProcessor;
use crate::shutdown::GracefulShutdown;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use handlers::{ErrorBody, HeadersResponse, HealthResponse};

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<BatchProcessor>,
}

impl AppState {
    pub fn new(processor: BatchProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }
}

/// Build the router with all endpoints
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let body_limit = usize::try_from(config.max_upload_bytes).unwrap_or(usize::MAX);

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/process-csv/", post(handlers::process_csv))
        .route("/process-csv", post(handlers::process_csv))
        .route("/extract-headers/", post(handlers::extract_headers))
        .route("/extract-headers", post(handlers::extract_headers));

    // Single-page front-end: unknown paths fall back to index.html
    let router = match &config.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` is requested.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: GracefulShutdown,
) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}
