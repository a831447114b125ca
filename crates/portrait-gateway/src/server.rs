// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loopback HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the generation backend.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use portrait_core::{ControlSurface, PortraitError};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::service::GenerationService;
use crate::tabs::TabBridge;
use crate::ws;

/// Largest request body accepted (uploads arrive as multipart or data URLs).
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Health state for the unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GenerationService>,
    /// Page agents connected over `/ws/page`.
    pub tabs: TabBridge,
    /// Scheduler control surface, attached once the scheduler runs.
    pub control: Option<Arc<dyn ControlSurface>>,
    pub health: HealthState,
}

impl AppState {
    pub fn new(service: Arc<GenerationService>, tabs: TabBridge) -> Self {
        Self {
            service,
            tabs,
            control: None,
            health: HealthState::default(),
        }
    }

    pub fn with_control(mut self, control: Arc<dyn ControlSurface>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = health;
        self
    }
}

/// Bind address for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&portrait_config::model::ServerConfig> for ServerConfig {
    fn from(config: &portrait_config::model::ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Builds the full router. Separate from [`start_server`] so tests can
/// drive it with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route("/generate-images", post(handlers::post_generate_images))
        .route(
            "/generate-images-base64",
            post(handlers::post_generate_images_base64),
        )
        .route("/generate-from-base", post(handlers::post_generate_from_base))
        .route(
            "/images",
            get(handlers::get_images).delete(handlers::delete_images),
        )
        .route("/images/{filename}", get(handlers::get_image))
        .route("/upload-base", post(handlers::post_upload_base))
        .route("/control", post(handlers::post_control))
        .route("/ws/page", get(ws::ws_page_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), PortraitError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PortraitError::Internal(format!("failed to bind server to {addr}: {e}")))?;
    serve_listener(listener, state, cancel).await
}

/// Serves on an already bound listener until `cancel` fires.
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), PortraitError> {
    let app = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("portrait server listening on {addr}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| PortraitError::Internal(format!("server error: {e}")))?;

    tracing::info!("portrait server stopped");
    Ok(())
}
