//! Router configuration for the pipeline relay.
//!
//! # Route Structure
//!
//! ```text
//! /health                           - Health check
//! /api/download/glb/{*run_dir}      - GLB download (streamed, CORS open)
//! /api/layoutvlm-gif/{*run_dir}     - LayoutVLM GIF (buffered)
//! /api/upload/room                  - USDZ room upload
//! ```
//!
//! The download routes also answer without a run directory, with a 400.
//!
//! # Example
//!
//! ```ignore
//! use pipeline_relay::relay::Upstream;
//! use pipeline_relay::server::routes::{create_router, RouterConfig};
//!
//! let upstream = Upstream::new("http://localhost:8000")?;
//! let router = create_router(upstream, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    glb_download_handler, health_handler, layout_gif_handler, missing_run_dir_handler,
    upload_room_handler, AppState,
};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::relay::{Upstream, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_EXPOSE_HEADERS};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Largest accepted upload request body in bytes
    pub max_upload_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with the default upload limit and tracing on.
    pub fn new() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            enable_tracing: true,
        }
    }

    /// Set the upload size limit in bytes.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// CORS is opened on the GLB download routes only, preflight included.
pub fn create_router(upstream: Upstream, config: RouterConfig) -> Router {
    let app_state = AppState::new(upstream);
    let glb_cors = build_glb_cors_layer();

    let router = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/download/glb",
            get(missing_run_dir_handler).layer(glb_cors.clone()),
        )
        .route(
            "/api/download/glb/",
            get(missing_run_dir_handler).layer(glb_cors.clone()),
        )
        .route(
            "/api/download/glb/{*run_dir}",
            get(glb_download_handler).layer(glb_cors),
        )
        .route("/api/layoutvlm-gif", get(missing_run_dir_handler))
        .route("/api/layoutvlm-gif/", get(missing_run_dir_handler))
        .route("/api/layoutvlm-gif/{*run_dir}", get(layout_gif_handler))
        .route(
            "/api/upload/room",
            post(upload_room_handler).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .with_state(app_state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the permissive CORS layer used on the GLB download.
fn build_glb_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(CORS_ALLOW_METHODS)
        .allow_headers(CORS_ALLOW_HEADERS)
        .expose_headers(CORS_EXPOSE_HEADERS)
        .max_age(Duration::from_secs(86400)) // 24 hours
}

// =============================================================================
// Tests
// =============================================================================
