//! The pipeline service client and the relay operations built on it.

use axum::{
    body::Body,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::TryStreamExt;
use http::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CACHE_CONTROL, CONTENT_DISPOSITION,
    CONTENT_LENGTH, CONTENT_TYPE,
};
use http::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::endpoint::{
    BodyMode, DownloadEndpoint, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_EXPOSE_HEADERS,
    RUN_DIR_PARAM, UPLOAD_FIELD, UPLOAD_ROOM_PATH,
};
use super::envelope::relay_failure;
use super::upload::RoomUpload;
use crate::error::{RelayError, UpstreamConfigError};

/// `detail` reported when an upload fails upstream without a usable body.
const UPLOAD_FAILURE_DETAIL: &str = "Failed to upload room";

/// `detail` relayed when a successful upload response is not JSON.
const UPLOAD_INVALID_RESPONSE: &str = "Upload failed: invalid response from pipeline service";

/// Client for the pipeline service.
///
/// Holds the base URL and the HTTP client; both are fixed at construction.
/// Cloning is cheap and clones share the underlying client.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: Url,
}

impl Upstream {
    /// Create a client for the pipeline service at `base_url`.
    ///
    /// Idle connections are not kept between requests.
    pub fn new(base_url: &str) -> Result<Self, UpstreamConfigError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamConfigError::NotABase(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pipeline-relay/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Build the upstream URL for an endpoint path and trailing parameter segments.
    ///
    /// Each segment is percent-encoded on its own, so a parameter split on `/`
    /// keeps its separators.
    pub fn endpoint_url(&self, endpoint_path: &str, params: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(endpoint_path.split('/'))
                .extend(params);
        }
        url
    }

    // =========================================================================
    // Downloads
    // =========================================================================

    /// Relay a download from `endpoint` for the run directory `run_dir`.
    ///
    /// Successful responses are relayed with the upstream status and the
    /// endpoint's header policy; failures are normalized to JSON with the
    /// upstream status. `Err` is returned only when no upstream response was
    /// obtained, or when `run_dir` is empty.
    pub async fn download(
        &self,
        endpoint: &DownloadEndpoint,
        run_dir: &str,
    ) -> Result<Response, RelayError> {
        let segments = param_segments(run_dir);
        if segments.is_empty() {
            return Err(RelayError::MissingParameter {
                name: RUN_DIR_PARAM,
            });
        }

        let url = self.endpoint_url(endpoint.upstream_path, &segments);
        debug!(endpoint = endpoint.name, %url, "Relaying download");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, endpoint.accept)
            .send()
            .await
            .map_err(RelayError::transport)?;

        if !response.status().is_success() {
            return Ok(relay_failure(response, endpoint.failure_detail).await);
        }

        match endpoint.body_mode {
            BodyMode::Streamed => Ok(stream_through(endpoint, response)),
            BodyMode::Buffered => buffer(endpoint, response).await,
        }
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Forward a validated room upload to the pipeline service.
    ///
    /// The outgoing form gets its `Content-Type` (with boundary) from the
    /// multipart encoder.
    pub async fn upload(&self, upload: RoomUpload) -> Result<Response, RelayError> {
        let RoomUpload {
            filename,
            content_type,
            data,
        } = upload;

        let size = data.len() as u64;
        let part = Part::stream_with_length(data, size).file_name(filename.clone());
        let part = match content_type {
            Some(ref mime) => part.mime_str(mime).map_err(|_| {
                RelayError::InvalidUpload(format!("Invalid file content type: {}", mime))
            })?,
            None => part,
        };
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.endpoint_url(UPLOAD_ROOM_PATH, &[]);
        info!(filename = %filename, size, %url, "Relaying room upload");

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(RelayError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Ok(relay_failure(response, UPLOAD_FAILURE_DETAIL).await);
        }

        let bytes = response.bytes().await.map_err(RelayError::transport)?;
        let body = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
            warn!(status = status.as_u16(), "Upload response was not JSON");
            json!({ "detail": UPLOAD_INVALID_RESPONSE })
        });

        Ok((status, Json(body)).into_response())
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Ask the pipeline service for its health status.
    pub async fn probe_health(&self) -> Result<StatusCode, RelayError> {
        let response = self
            .client
            .get(self.endpoint_url("health", &[]))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(RelayError::transport)?;

        Ok(response.status())
    }
}

/// Split a path parameter into the segments sent upstream.
///
/// Empty, whitespace-only, `.` and `..` segments are dropped.
pub fn param_segments(param: &str) -> Vec<&str> {
    param
        .split('/')
        .filter(|s| !s.trim().is_empty() && *s != "." && *s != "..")
        .collect()
}

/// Headers shared by both body modes on success.
fn success_headers(endpoint: &DownloadEndpoint, upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        CONTENT_TYPE,
        upstream
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(endpoint.default_content_type)),
    );

    if let Some(disposition) = endpoint.default_disposition {
        headers.insert(
            CONTENT_DISPOSITION,
            upstream
                .get(CONTENT_DISPOSITION)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(disposition)),
        );
    }

    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static(endpoint.cache_control),
    );

    if endpoint.open_cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        for (name, values) in [
            (
                ACCESS_CONTROL_ALLOW_METHODS,
                comma_list(CORS_ALLOW_METHODS.iter().map(|m| m.as_str())),
            ),
            (
                ACCESS_CONTROL_ALLOW_HEADERS,
                comma_list(CORS_ALLOW_HEADERS.iter().map(|h| h.as_str())),
            ),
            (
                ACCESS_CONTROL_EXPOSE_HEADERS,
                comma_list(CORS_EXPOSE_HEADERS.iter().map(|h| h.as_str())),
            ),
        ] {
            if let Some(value) = values {
                headers.insert(name, value);
            }
        }
    }

    headers
}

/// Join header tokens into one comma-separated value.
fn comma_list<'a>(items: impl Iterator<Item = &'a str>) -> Option<HeaderValue> {
    HeaderValue::from_str(&items.collect::<Vec<_>>().join(", ")).ok()
}

/// Pipe the upstream body to the client as it arrives.
fn stream_through(endpoint: &DownloadEndpoint, response: reqwest::Response) -> Response {
    let status = response.status();
    let mut headers = success_headers(endpoint, response.headers());

    if let Some(length) = response.headers().get(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, length.clone());
    }

    let name = endpoint.name;
    let stream = response.bytes_stream().inspect_err(move |e| {
        warn!(endpoint = name, "Upstream body stream aborted: {}", e);
    });

    (status, headers, Body::from_stream(stream)).into_response()
}

/// Read the whole upstream body, then respond with it.
async fn buffer(
    endpoint: &DownloadEndpoint,
    response: reqwest::Response,
) -> Result<Response, RelayError> {
    let status = response.status();
    let headers = success_headers(endpoint, response.headers());
    let data = response.bytes().await.map_err(RelayError::transport)?;

    debug!(endpoint = endpoint.name, size = data.len(), "Buffered upstream body");

    Ok((status, headers, data).into_response())
}
