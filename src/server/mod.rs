//! HTTP API over the engine

mod handlers;
mod response;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::Engine;
use crate::error::{MangoDeskError, Result};
use handlers::*;

/// Headroom for multipart framing on top of the file size limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| MangoDeskError::Config(format!("Invalid CORS origin {}: {}", origin, e)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

pub fn build_router(state: AppState) -> Result<Router> {
    let server = &state.engine.config().server;
    let cors = cors_layer(&server.cors_origin)?;
    let body_limit = server.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/db", get(db_health))
        .route("/api/upload", post(upload_file))
        .route("/api/upload/:file_id", get(get_file))
        .route("/api/summary/generate", post(generate_summary))
        .route("/api/summary/:summary_id", get(get_summary).put(update_summary))
        .route("/api/summary/:summary_id/versions", get(list_versions))
        .route("/api/summary/:summary_id/diff", get(summary_diff))
        .route("/api/diff", post(diff_texts))
        .route("/api/email/send", post(send_email))
        .route("/api/email/history", get(email_history))
        .route("/api/email/:share_id", get(get_email_share))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind and serve until interrupted
pub async fn serve(engine: Engine, bind_address: &str) -> Result<()> {
    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = build_router(state)?;

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🚀 MangoDesk API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
