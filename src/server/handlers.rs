//! HTTP request handlers for the relay API.
//!
//! # Endpoints
//!
//! - `GET /api/download/glb/{run_dir}` - Stream the final scene GLB
//! - `GET /api/layoutvlm-gif/{run_dir}` - Fetch the LayoutVLM optimization GIF
//! - `POST /api/upload/room` - Upload a USDZ room scan
//! - `GET /health` - Health check endpoint

use axum::{
    extract::{multipart::MultipartRejection, rejection::PathRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::RelayError;
use crate::relay::{
    read_room_upload, ErrorEnvelope, Upstream, GLB_DOWNLOAD, LAYOUT_GIF, RUN_DIR_PARAM,
};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the upstream client.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Client for the pipeline service
    pub upstream: Upstream,
}

impl AppState {
    /// Create a new application state around the given upstream client.
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert RelayError to HTTP response.
///
/// Validation errors are expected and logged at DEBUG; transport failures
/// are logged at ERROR and carry `error` and `timestamp` in the body.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();

        let envelope = match &self {
            RelayError::Transport(message) => {
                error!(status = status.as_u16(), "Upstream request failed: {}", message);
                ErrorEnvelope::transport(message.as_str())
            }
            RelayError::Multipart { .. } if status != StatusCode::BAD_REQUEST => {
                warn!(status = status.as_u16(), "Rejected upload: {}", self);
                ErrorEnvelope::new(self.to_string())
            }
            _ => {
                debug!(status = status.as_u16(), "Validation error: {}", self);
                ErrorEnvelope::new(self.to_string())
            }
        };

        (status, Json(envelope)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Stream the final scene GLB for a pipeline run.
///
/// # Endpoint
///
/// `GET /api/download/glb/{run_dir}`
///
/// `run_dir` may span several path segments.
///
/// # Response
///
/// - `2xx`: GLB bytes streamed from the pipeline service with
///   `Content-Type`, `Content-Disposition`, `Content-Length` (when known),
///   `Cache-Control` and open CORS headers
/// - upstream `4xx`/`5xx`: JSON error with the upstream status
/// - `500`: the pipeline service could not be reached
pub async fn glb_download_handler(
    State(state): State<AppState>,
    run_dir: Result<Path<String>, PathRejection>,
) -> Result<Response, RelayError> {
    let run_dir = run_dir_param(run_dir)?;
    state.upstream.download(&GLB_DOWNLOAD, &run_dir).await
}

/// Fetch the LayoutVLM optimization GIF for a pipeline run.
///
/// # Endpoint
///
/// `GET /api/layoutvlm-gif/{run_dir}`
///
/// The GIF is read fully before it is returned.
pub async fn layout_gif_handler(
    State(state): State<AppState>,
    run_dir: Result<Path<String>, PathRejection>,
) -> Result<Response, RelayError> {
    let run_dir = run_dir_param(run_dir)?;
    state.upstream.download(&LAYOUT_GIF, &run_dir).await
}

/// Unwrap the `run_dir` path parameter, reporting undecodable paths as JSON.
fn run_dir_param(extracted: Result<Path<String>, PathRejection>) -> Result<String, RelayError> {
    extracted
        .map(|Path(run_dir)| run_dir)
        .map_err(|rejection| RelayError::InvalidParameter {
            name: RUN_DIR_PARAM,
            message: rejection.body_text(),
        })
}

/// Answer download routes called without a run directory.
pub async fn missing_run_dir_handler() -> RelayError {
    RelayError::MissingParameter {
        name: RUN_DIR_PARAM,
    }
}

/// Upload a USDZ room scan to the pipeline service.
///
/// # Endpoint
///
/// `POST /api/upload/room` with a multipart form carrying a `file` field.
///
/// # Response
///
/// - upstream status with the upstream JSON body
/// - `400 Bad Request`: no `file` field, not a file, or not a `.usdz` file
/// - `413 Payload Too Large`: upload exceeds the configured limit
/// - `500 Internal Server Error`: the pipeline service could not be reached
pub async fn upload_room_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let upload = read_room_upload(multipart?).await?;
    state.upstream.upload(upload).await
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
