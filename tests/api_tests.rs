//! End-to-end tests for the HTTP API.
//!
//! Requests are driven through the router with `tower::ServiceExt::oneshot`
//! and hand-built multipart bodies, without binding a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use stegomark::api::{router, AppState};
use stegomark::codec;
use stegomark::codec::watermark::load_font;
use stegomark::common::config::{ServerSettings, DEFAULT_MAX_UPLOAD_BYTES};

const BOUNDARY: &str = "stegomark-test-boundary";

fn test_app() -> Router {
    let settings = ServerSettings {
        bind_addr: "127.0.0.1:0".to_string(),
        static_dir: "static".to_string(),
        font_path: None,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    };
    router(Arc::new(AppState::new(settings)))
}

/// Builder for raw multipart/form-data bodies.
#[derive(Default)]
struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(content);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.bytes
    }
}

async fn post(app: Router, uri: &str, body: Vec<u8>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, bytes.to_vec())
}

fn carrier_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 5 % 256) as u8,
            (y * 11 % 256) as u8,
            ((x ^ y) % 256) as u8,
            255,
        ])
    });
    codec::to_png_bytes(&image).unwrap()
}

#[tokio::test]
async fn health_reports_service_identity() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "stegomark");
}

#[tokio::test]
async fn encode_then_decode_roundtrips_over_http() {
    let body = MultipartBody::default()
        .file("image", "carrier.png", &carrier_png(48, 48))
        .text("message", "meet at noon")
        .finish();
    let (status, content_type, png) = post(test_app(), "/steganography/encode", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));

    let body = MultipartBody::default()
        .file("image", "stego.png", &png)
        .finish();
    let (status, _, bytes) = post(test_app(), "/steganography/decode", body).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["message"], "meet at noon");
}

#[tokio::test]
async fn encode_without_message_is_bad_request() {
    let body = MultipartBody::default()
        .file("image", "carrier.png", &carrier_png(16, 16))
        .finish();
    let (status, _, bytes) = post(test_app(), "/steganography/encode", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().contains("message"));
}

#[tokio::test]
async fn encode_with_garbage_image_is_unprocessable() {
    let body = MultipartBody::default()
        .file("image", "carrier.png", b"not an image at all")
        .text("message", "hi")
        .finish();
    let (status, _, bytes) = post(test_app(), "/steganography/encode", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn oversized_message_is_rejected() {
    let body = MultipartBody::default()
        .file("image", "tiny.png", &carrier_png(2, 2))
        .text("message", "this will never fit in a 2x2 image")
        .finish();
    let (status, _, bytes) = post(test_app(), "/steganography/encode", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().contains("too long"));
}

#[tokio::test]
async fn steps_mode_returns_json_trace_and_base64_image() {
    let body = MultipartBody::default()
        .file("image", "carrier.png", &carrier_png(48, 48))
        .text("message", "traced")
        .text("steps", "true")
        .finish();
    let (status, content_type, bytes) = post(test_app(), "/steganography/encode", body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/json"));

    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], true);
    let steps = json["steps"].as_array().unwrap();
    assert!(steps.len() >= 5);
    assert!(steps.iter().all(|s| s["status"] == "success"));

    // The embedded base64 PNG must still carry the message.
    let png = general_purpose::STANDARD
        .decode(json["image"].as_str().unwrap())
        .unwrap();
    let image = codec::load_image(&png).unwrap();
    let (message, _) = codec::steganography::decode_message(&image);
    assert_eq!(message, "traced");
}

#[tokio::test]
async fn decode_of_plain_image_reports_sentinel() {
    let plain = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        16,
        16,
        Rgba([200, 100, 50, 255]),
    ));
    let png = codec::to_png_bytes(&plain.to_rgba8()).unwrap();
    let body = MultipartBody::default()
        .file("image", "plain.png", &png)
        .finish();
    let (status, _, bytes) = post(test_app(), "/steganography/decode", body).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["message"], "No hidden message found");
}

#[tokio::test]
async fn capacity_endpoint_reports_limits() {
    let body = MultipartBody::default()
        .file("image", "carrier.png", &carrier_png(10, 10))
        .finish();
    let (status, _, bytes) = post(test_app(), "/steganography/capacity", body).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["total_samples"], 400);
    assert_eq!(json["max_bits"], 384);
    assert_eq!(json["max_chars"], 48);
}

#[tokio::test]
async fn invisible_watermark_roundtrips_over_http() {
    let body = MultipartBody::default()
        .file("image", "carrier.png", &carrier_png(48, 48))
        .text("text", "studio-credit")
        .finish();
    let (status, content_type, png) = post(test_app(), "/watermark/invisible/add", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));

    let body = MultipartBody::default()
        .file("image", "marked.png", &png)
        .finish();
    let (status, _, bytes) = post(test_app(), "/watermark/invisible/extract", body).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["watermark"], "studio-credit");
}

#[tokio::test]
async fn extract_from_unmarked_image_reports_sentinel() {
    let body = MultipartBody::default()
        .file("image", "plain.png", &carrier_png(32, 32))
        .finish();
    let (status, _, bytes) = post(test_app(), "/watermark/invisible/extract", body).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["watermark"], "No watermark found");
}

#[tokio::test]
async fn logo_watermark_returns_modified_png() {
    let base = carrier_png(100, 100);
    let logo = codec::to_png_bytes(&RgbaImage::from_pixel(
        40,
        40,
        Rgba([255, 0, 0, 255]),
    ))
    .unwrap();
    let body = MultipartBody::default()
        .file("image", "base.png", &base)
        .file("logo", "logo.png", &logo)
        .text("position", "top-left")
        .text("opacity", "255")
        .text("scale", "0.3")
        .finish();
    let (status, content_type, png) = post(test_app(), "/watermark/image", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));

    // 30x30 logo at (20, 20): the marked corner is red-dominated.
    let marked = codec::load_image(&png).unwrap().to_rgb8();
    let inside = marked.get_pixel(30, 30);
    assert!(inside.0[0] > 200 && inside.0[1] < 100);
}

#[tokio::test]
async fn visible_text_watermark_returns_png() {
    // Needs a system font; skip quietly on hosts without one.
    if load_font(None).is_err() {
        return;
    }
    let body = MultipartBody::default()
        .file("image", "base.png", &carrier_png(200, 200))
        .text("text", "CONFIDENTIAL")
        .text("position", "center")
        .text("opacity", "200")
        .finish();
    let (status, content_type, png) = post(test_app(), "/watermark/visible", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert!(codec::load_image(&png).is_ok());
}

#[tokio::test]
async fn compare_reports_identical_images() {
    let png = carrier_png(16, 16);
    let body = MultipartBody::default()
        .file("original", "a.png", &png)
        .file("modified", "b.png", &png)
        .finish();
    let (status, _, bytes) = post(test_app(), "/compare", body).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["identical"], true);
    assert_eq!(json["mse"], 0.0);
    assert!(json["psnr"].is_null());
}

#[tokio::test]
async fn compare_rejects_mismatched_sizes() {
    let body = MultipartBody::default()
        .file("original", "a.png", &carrier_png(16, 16))
        .file("modified", "b.png", &carrier_png(8, 8))
        .finish();
    let (status, _, bytes) = post(test_app(), "/compare", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().contains("dimensions"));
}
