//! The JSON error shape returned for every failure.
//!
//! Upstream failures are passed through when their body is JSON; everything
//! else is wrapped into `{ "detail": ... }`. Failures that never reached the
//! pipeline service also carry `error` and `timestamp`.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// JSON error body produced by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable error message
    pub detail: String,

    /// Underlying error message, for failures raised by the relay itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// RFC 3339 time the failure was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ErrorEnvelope {
    /// Create an envelope carrying only a `detail` message.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            error: None,
            timestamp: None,
        }
    }

    /// Create the envelope for a request that never got an upstream response.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            detail: format!("Pipeline service request failed: {}", message),
            error: Some(message),
            timestamp: Some(now_timestamp()),
        }
    }
}

/// Current UTC time in RFC 3339 form with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalize the text body of a failed upstream response.
///
/// Valid JSON is returned verbatim, whatever its shape. Other text becomes
/// `{ "detail": text }`, and an empty body falls back to `fallback`.
pub fn failure_body(text: &str, fallback: &str) -> Value {
    if text.trim().is_empty() {
        return json!({ "detail": fallback });
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => json!({ "detail": text }),
    }
}

/// Relay a non-success upstream response as JSON with its original status.
pub async fn relay_failure(response: reqwest::Response, fallback: &str) -> Response {
    let status = response.status();
    let url = response.url().clone();

    let body = match response.text().await {
        Ok(text) => failure_body(&text, fallback),
        Err(e) => {
            warn!(status = status.as_u16(), %url, "Failed to read upstream error body: {}", e);
            json!({ "detail": fallback })
        }
    };

    if status.is_server_error() {
        warn!(status = status.as_u16(), %url, "Upstream server error");
    } else {
        debug!(status = status.as_u16(), %url, "Upstream client error");
    }

    (status, Json(body)).into_response()
}
