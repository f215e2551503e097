//! Configuration management for the pipeline relay.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks and defaults for everything.
//!
//! # Example
//!
//! ```ignore
//! use pipeline_relay::config::Config;
//!
//! let config = Config::parse();
//! println!("Relaying to {}", config.upstream_url);
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_HOST` - Server bind address (default: 0.0.0.0)
//! - `RELAY_PORT` - Server port (default: 3000)
//! - `PIPELINE_API_URL` - Base URL of the pipeline service (default: http://localhost:8000)
//! - `RELAY_MAX_UPLOAD_BYTES` - Largest accepted room upload (default: 100 MiB)

use clap::Parser;
use url::Url;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default pipeline service base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8000";

/// Default maximum upload size in bytes (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Pipeline Relay - forwards room uploads and result downloads to the layout pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "pipeline-relay")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "RELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RELAY_PORT")]
    pub port: u16,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// Base URL of the pipeline service that requests are relayed to.
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL, env = "PIPELINE_API_URL")]
    pub upstream_url: String,

    /// Maximum accepted size of a room upload request body, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "RELAY_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.upstream_url)
            .map_err(|e| format!("Invalid upstream URL '{}': {}", self.upstream_url, e))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "Upstream URL must use http or https, got '{}'. Set --upstream-url or PIPELINE_API_URL",
                url.scheme()
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
