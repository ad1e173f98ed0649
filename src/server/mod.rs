//! HTTP front end: the upload form, the conversion endpoint and diagnostics.
//!
//! Endpoints:
//! - GET  /                 - Upload form with the diagnostics panel
//! - POST /convert          - Multipart upload → `.docx` download
//! - GET  /api/diagnostics  - Probe report as JSON
//! - GET  /health           - Liveness check
//!
//! Requests share one immutable [`AppState`]; each conversion gets its own
//! staging directory, so nothing is locked.

mod form;
mod routes;

use crate::config::ConverterConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub use form::render_index;
pub use routes::{content_disposition, parse_checkbox};

/// Settings for the HTTP listener.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Address to listen on. Default: `127.0.0.1:8501`.
    pub bind: SocketAddr,
    /// Largest accepted request body in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    converter: ConverterConfig,
    server: ServerConfig,
}

impl AppState {
    pub fn new(converter: ConverterConfig, server: ServerConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner { converter, server }),
        }
    }

    /// Get the converter configuration
    pub fn converter(&self) -> &ConverterConfig {
        &self.inner.converter
    }

    /// Get the listener configuration
    pub fn server(&self) -> &ServerConfig {
        &self.inner.server
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let limit = state.server().max_upload_bytes;
    Router::new()
        .route("/", get(routes::index))
        .route("/convert", post(routes::convert_upload))
        .route("/api/diagnostics", get(routes::diagnostics))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until Ctrl+C / SIGTERM.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr = state.server().bind;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("tex2docx listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
