//! # Pipeline Relay
//!
//! An HTTP relay in front of the room layout pipeline service.
//!
//! The relay forwards room scan uploads and result downloads to a fixed
//! upstream base URL. Large model downloads are streamed through without
//! buffering, and every failure reaches the client as a JSON object with a
//! `detail` field, whatever shape the upstream error had.
//!
//! ## Features
//!
//! - **Streamed downloads**: GLB scene files are piped through chunk by chunk
//! - **Buffered downloads**: small images are read whole, then returned
//! - **Upload forwarding**: `.usdz` room scans are validated and re-sent as multipart
//! - **Uniform errors**: upstream failures keep their status; transport failures become 500
//!
//! ## Architecture
//!
//! - [`relay`] - Upstream client, endpoint table, upload parsing, error envelope
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pipeline_relay::{create_router, RouterConfig, Upstream};
//!
//! #[tokio::main]
//! async fn main() {
//!     let upstream = Upstream::new("http://localhost:8000").unwrap();
//!     let router = create_router(upstream, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod relay;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{RelayError, UpstreamConfigError};
pub use relay::{
    BodyMode, DownloadEndpoint, ErrorEnvelope, RoomUpload, Upstream, GLB_DOWNLOAD, LAYOUT_GIF,
};
pub use server::{create_router, AppState, HealthResponse, RouterConfig};
