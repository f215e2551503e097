//! Download relay tests.
//!
//! Tests verify:
//! - GLB downloads stream bytes and headers through unchanged
//! - GIF downloads are buffered with their fallbacks applied
//! - GLB bytes reach the client before the upstream body completes
//! - Missing or undecodable run directories never reach the pipeline service
//! - Upstream error bodies are normalized and keep their status
//! - Transport failures become 500 with a timestamp

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::DateTime;
use http_body_util::BodyExt;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pipeline_relay::{create_router, RouterConfig, Upstream, GLB_DOWNLOAD, LAYOUT_GIF};

use super::test_utils::{
    body_bytes, body_json, expect_no_upstream_calls, get_request, gif_payload, glb_payload,
    relay_router, unreachable_router,
};

// =============================================================================
// GLB Download (streamed)
// =============================================================================

#[tokio::test]
async fn test_glb_download_streams_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/abc123"))
        .and(header("accept", GLB_DOWNLOAD.accept))
        .respond_with(ResponseTemplate::new(200).set_body_raw(glb_payload(), "model/gltf-binary"))
        .expect(1)
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "model/gltf-binary"
    );
    assert_eq!(response.headers().get("content-length").unwrap(), "10");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        GLB_DOWNLOAD.cache_control
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"room.glb\""
    );

    let body = body_bytes(response).await;
    assert_eq!(body, glb_payload());
}

/// Read an HTTP/1.1 request head from `socket`.
async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before request head");
        head.extend_from_slice(&buf[..n]);
    }
}

#[tokio::test]
async fn test_glb_download_forwards_bytes_before_upstream_finishes() {
    let payload = glb_payload();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let pipeline = {
        let payload = payload.clone();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request_head(&mut socket).await;

            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: model/gltf-binary\r\ncontent-length: {}\r\n\r\n",
                payload.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&payload[..5]).await.unwrap();
            socket.flush().await.unwrap();

            release_rx.await.unwrap();
            socket.write_all(&payload[5..]).await.unwrap();
            socket.flush().await.unwrap();
        })
    };

    let upstream = Upstream::new(&format!("http://{}", addr)).unwrap();
    let router = create_router(upstream, RouterConfig::new().with_tracing(false));
    let response = router
        .oneshot(get_request("/api/download/glb/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-length").unwrap(), "10");

    // The rest of the payload is held back until the first bytes arrive.
    let mut body = response.into_body();
    let mut first = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while first.len() < 5 {
            let frame = body.frame().await.unwrap().unwrap();
            if let Ok(data) = frame.into_data() {
                first.extend_from_slice(&data);
            }
        }
    })
    .await
    .expect("first bytes were not forwarded before the upstream body completed");
    assert_eq!(first, payload[..5]);

    release_tx.send(()).unwrap();
    let rest = body.collect().await.unwrap().to_bytes();
    assert_eq!(&rest[..], &payload[5..]);

    pipeline.await.unwrap();
}

#[tokio::test]
async fn test_glb_download_keeps_upstream_disposition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    "attachment; filename=\"room_with_assets_final.glb\"",
                )
                .set_body_raw(glb_payload(), "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"room_with_assets_final.glb\""
    );
}

#[tokio::test]
async fn test_glb_download_nested_run_dir() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/runs/2024-06-01/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(glb_payload(), "model/gltf-binary"))
        .expect(1)
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/runs/2024-06-01/abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_glb_download_relays_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/partial"))
        .respond_with(ResponseTemplate::new(206).set_body_raw(glb_payload(), "model/gltf-binary"))
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/partial"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
}

#[tokio::test]
async fn test_glb_download_cors_preflight() {
    let server = MockServer::start().await;
    expect_no_upstream_calls(&server).await;

    let router = relay_router(&server);
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/download/glb/abc123")
        .header("origin", "https://viewer.example.com")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    server.verify().await;
}

// =============================================================================
// LayoutVLM GIF (buffered)
// =============================================================================

#[tokio::test]
async fn test_layout_gif_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/layoutvlm-gif/abc123"))
        .and(header("accept", LAYOUT_GIF.accept))
        .respond_with(ResponseTemplate::new(200).set_body_raw(gif_payload(), "image/gif"))
        .expect(1)
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/layoutvlm-gif/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/gif");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        LAYOUT_GIF.cache_control
    );
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());

    let body = body_bytes(response).await;
    assert_eq!(body, gif_payload());
}

#[tokio::test]
async fn test_layout_gif_default_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/layoutvlm-gif/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gif_payload()))
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/layoutvlm-gif/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/gif");
}

// =============================================================================
// Missing Run Directory
// =============================================================================

#[tokio::test]
async fn test_missing_run_dir_makes_no_upstream_call() {
    let server = MockServer::start().await;
    expect_no_upstream_calls(&server).await;

    for uri in [
        "/api/download/glb",
        "/api/download/glb/",
        "/api/layoutvlm-gif",
        "/api/layoutvlm-gif/",
        "/api/download/glb/%20",
        "/api/layoutvlm-gif/..",
    ] {
        let router = relay_router(&server);
        let response = router.oneshot(get_request(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert!(body["detail"].is_string(), "{}", uri);
    }

    server.verify().await;
}

#[tokio::test]
async fn test_undecodable_run_dir_returns_json() {
    let server = MockServer::start().await;
    expect_no_upstream_calls(&server).await;

    for uri in ["/api/download/glb/%FF", "/api/layoutvlm-gif/%FF"] {
        let router = relay_router(&server);
        let response = router.oneshot(get_request(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json",
            "{}",
            uri
        );
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("run_dir"), "{}", uri);
    }

    server.verify().await;
}

// =============================================================================
// Upstream Failures
// =============================================================================

#[tokio::test]
async fn test_upstream_json_error_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "GLB file not found" })),
        )
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body = body_json(response).await;
    assert_eq!(body, json!({ "detail": "GLB file not found" }));
}

#[tokio::test]
async fn test_upstream_json_error_keeps_extra_fields() {
    let server = MockServer::start().await;
    let upstream_body = json!({
        "detail": [{ "loc": ["path", "run_dir"], "msg": "field required" }],
        "request_id": "r-1"
    });
    Mock::given(method("GET"))
        .and(path("/layoutvlm-gif/bad"))
        .respond_with(ResponseTemplate::new(422).set_body_json(upstream_body.clone()))
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/layoutvlm-gif/bad"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await, upstream_body);
}

#[tokio::test]
async fn test_upstream_text_error_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/abc123"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream connect error"))
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await,
        json!({ "detail": "upstream connect error" })
    );
}

#[tokio::test]
async fn test_upstream_empty_error_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/layoutvlm-gif/abc123"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/layoutvlm-gif/abc123"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "detail": LAYOUT_GIF.failure_detail })
    );
}

#[tokio::test]
async fn test_upstream_error_has_no_cache_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/glb/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "nope" })))
        .mount(&server)
        .await;

    let router = relay_router(&server);
    let response = router
        .oneshot(get_request("/api/download/glb/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("cache-control").is_none());
}

// =============================================================================
// Transport Failures
// =============================================================================

#[tokio::test]
async fn test_transport_failure_returns_500() {
    for uri in ["/api/download/glb/abc123", "/api/layoutvlm-gif/abc123"] {
        let router = unreachable_router();
        let response = router.oneshot(get_request(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);

        let body = body_json(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(!error.is_empty());
        assert!(body["detail"].as_str().unwrap().contains(error));

        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok(), "{}", timestamp);
    }
}

// =============================================================================
// Upstream Health
// =============================================================================

#[tokio::test]
async fn test_probe_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = Upstream::new(&server.uri()).unwrap();
    assert_eq!(upstream.probe_health().await.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn test_probe_health_unreachable() {
    let upstream = Upstream::new("http://127.0.0.1:1").unwrap();
    assert!(upstream.probe_health().await.is_err());
}
