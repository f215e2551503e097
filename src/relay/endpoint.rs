//! Upstream endpoint descriptions.
//!
//! Every download the relay performs is described by a [`DownloadEndpoint`]:
//! where it lives on the pipeline service, what it accepts, and how its body
//! is handed back to the client. The relay logic itself is shared.

use http::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use http::Method;

/// How a successful upstream body is handed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Pipe the upstream body through chunk by chunk without buffering it.
    Streamed,
    /// Read the whole upstream body into memory, then respond.
    Buffered,
}

/// Description of a relayed download endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadEndpoint {
    /// Short name used in logs
    pub name: &'static str,

    /// Path on the pipeline service, relative to the base URL, without slashes at the ends
    pub upstream_path: &'static str,

    /// `Accept` header sent upstream
    pub accept: &'static str,

    /// Body handling for successful responses
    pub body_mode: BodyMode,

    /// `Content-Type` used when the upstream response has none
    pub default_content_type: &'static str,

    /// `Content-Disposition` used when the upstream response has none.
    ///
    /// `None` means the header is not relayed at all.
    pub default_disposition: Option<&'static str>,

    /// `Cache-Control` set on successful responses
    pub cache_control: &'static str,

    /// Whether successful responses carry permissive CORS headers
    pub open_cors: bool,

    /// `detail` reported when an upstream failure carries no usable body
    pub failure_detail: &'static str,
}

/// Cache policy for relayed result assets.
pub const RESULT_CACHE_CONTROL: &str = "public, max-age=3600";

/// Final scene model download, streamed.
pub const GLB_DOWNLOAD: DownloadEndpoint = DownloadEndpoint {
    name: "glb_download",
    upstream_path: "download/glb",
    accept: "model/gltf-binary",
    body_mode: BodyMode::Streamed,
    default_content_type: "model/gltf-binary",
    default_disposition: Some("attachment; filename=\"room.glb\""),
    cache_control: RESULT_CACHE_CONTROL,
    open_cors: true,
    failure_detail: "Failed to download GLB file",
};

/// LayoutVLM optimization animation, buffered.
pub const LAYOUT_GIF: DownloadEndpoint = DownloadEndpoint {
    name: "layoutvlm_gif",
    upstream_path: "layoutvlm-gif",
    accept: "image/gif",
    body_mode: BodyMode::Buffered,
    default_content_type: "image/gif",
    default_disposition: None,
    cache_control: RESULT_CACHE_CONTROL,
    open_cors: false,
    failure_detail: "Failed to fetch LayoutVLM gif",
};

/// Methods allowed by the open CORS policy.
pub const CORS_ALLOW_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::OPTIONS];

/// Request headers allowed by the open CORS policy.
pub const CORS_ALLOW_HEADERS: [HeaderName; 1] = [CONTENT_TYPE];

/// Response headers exposed to browsers by the open CORS policy.
pub const CORS_EXPOSE_HEADERS: [HeaderName; 2] = [CONTENT_LENGTH, CONTENT_DISPOSITION];

/// Room upload path on the pipeline service.
pub const UPLOAD_ROOM_PATH: &str = "upload/room";

/// Multipart field carrying the room file, both inbound and upstream.
pub const UPLOAD_FIELD: &str = "file";

/// Required room file extension, compared case-insensitively.
pub const ROOM_EXTENSION: &str = ".usdz";

/// Name of the download path parameter, as reported in validation errors.
pub const RUN_DIR_PARAM: &str = "run_dir";
