//! Relay layer between clients and the pipeline service.
//!
//! # Architecture
//!
//! ```text
//! client ──► handler ──► Upstream::download / Upstream::upload ──► pipeline service
//!                              │
//!                              ├─ success: stream or buffer the body, curated headers
//!                              ├─ upstream failure: same status, JSON body
//!                              └─ transport failure: 500 { detail, error, timestamp }
//! ```
//!
//! - [`endpoint`] - Descriptions of the relayed endpoints and their body modes
//! - [`upstream`] - The pipeline service client and relay operations
//! - [`upload`] - Inbound multipart parsing and validation
//! - [`envelope`] - The JSON error shape

pub mod endpoint;
pub mod envelope;
pub mod upload;
pub mod upstream;

pub use endpoint::{
    BodyMode, DownloadEndpoint, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_EXPOSE_HEADERS,
    GLB_DOWNLOAD, LAYOUT_GIF, RESULT_CACHE_CONTROL, ROOM_EXTENSION, RUN_DIR_PARAM, UPLOAD_FIELD,
    UPLOAD_ROOM_PATH,
};
pub use envelope::{failure_body, now_timestamp, relay_failure, ErrorEnvelope};
pub use upload::{has_room_extension, read_room_upload, RoomUpload};
pub use upstream::{param_segments, Upstream};
