//! HTTP server layer for the pipeline relay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /api/download/glb/..   GET /api/layoutvlm-gif/..          │
//! │   POST /api/upload/room      GET /health                        │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error JSON)   │  │  (router, CORS, limits)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    glb_download_handler, health_handler, layout_gif_handler, missing_run_dir_handler,
    upload_room_handler, AppState, HealthResponse,
};
pub use routes::{create_router, RouterConfig};
