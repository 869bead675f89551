//! Request handlers.
//!
//! Each handler follows the same shape: drain the multipart form, run the
//! codec, answer with PNG bytes or JSON. A per-request id ties log lines
//! together.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::{engine::general_purpose, Engine as _};
use log::info;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::multipart::collect;
use super::{ApiError, AppState};
use crate::codec::{self, steganography, watermark, CodecError, Step};

/// Service liveness and identity.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "stegomark",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /steganography/encode`: hide a message in an uploaded image.
pub async fn stego_encode(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let request_id = Uuid::new_v4();
    let carrier = form.file("image")?;
    let message = form.value("message")?;
    info!(
        "[{request_id}] 📤 encode: {} byte carrier, {} char message",
        carrier.len(),
        message.chars().count()
    );

    let image = codec::load_image(carrier)?;
    let (stego, steps) = steganography::encode_message(&image, message)?;
    let png = codec::to_png_bytes(&stego)?;
    info!("[{request_id}] ✅ encoded, {} byte PNG", png.len());

    if form.wants_steps() {
        Ok(steps_image_response(&png, steps))
    } else {
        Ok(png_response(png))
    }
}

/// `POST /steganography/decode`: recover a hidden message.
pub async fn stego_decode(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let request_id = Uuid::new_v4();
    let carrier = form.file("image")?;
    info!("[{request_id}] 📤 decode: {} byte image", carrier.len());

    let image = codec::load_image(carrier)?;
    let (message, steps) = steganography::decode_message(&image);
    info!("[{request_id}] ✅ decoded {} characters", message.chars().count());

    if form.wants_steps() {
        Ok(Json(json!({
            "success": true,
            "message": message,
            "steps": steps,
        }))
        .into_response())
    } else {
        Ok(Json(json!({ "message": message })).into_response())
    }
}

/// `POST /steganography/capacity`: how much text an image can carry.
pub async fn stego_capacity(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let carrier = form.file("image")?;
    let image = codec::load_image(carrier)?;
    Ok(Json(steganography::capacity(&image)).into_response())
}

/// `POST /watermark/visible`: stamp translucent text onto an image.
pub async fn watermark_visible(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let request_id = Uuid::new_v4();
    let carrier = form.file("image")?;
    let text = form.value("text")?;
    let position = form.position();
    let opacity = form.opacity()?;
    info!(
        "[{request_id}] 📤 text watermark: \"{text}\" at {} (opacity {opacity})",
        position.label()
    );

    let font = state.font.as_ref().ok_or(CodecError::FontUnavailable)?;
    let image = codec::load_image(carrier)?;
    let (marked, steps) = watermark::add_text_watermark(&image, text, position, opacity, font)?;
    let png = codec::rgb_to_png_bytes(&marked)?;
    info!("[{request_id}] ✅ watermarked, {} byte PNG", png.len());

    if form.wants_steps() {
        Ok(steps_image_response(&png, steps))
    } else {
        Ok(png_response(png))
    }
}

/// `POST /watermark/image`: blend a logo onto an image.
pub async fn watermark_image(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let request_id = Uuid::new_v4();
    let carrier = form.file("image")?;
    let logo = form.file("logo")?;
    let position = form.position();
    let opacity = form.opacity()?;
    let scale = form.scale()?;
    info!(
        "[{request_id}] 📤 logo watermark at {} (opacity {opacity}, scale {scale})",
        position.label()
    );

    let base = codec::load_image(carrier)?;
    let logo = codec::load_image(logo)?;
    let (marked, steps) = watermark::add_logo_watermark(&base, &logo, position, opacity, scale)?;
    let png = codec::rgb_to_png_bytes(&marked)?;
    info!("[{request_id}] ✅ watermarked, {} byte PNG", png.len());

    if form.wants_steps() {
        Ok(steps_image_response(&png, steps))
    } else {
        Ok(png_response(png))
    }
}

/// `POST /watermark/invisible/add`: embed a `WM:`-tagged payload.
pub async fn watermark_invisible_add(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let request_id = Uuid::new_v4();
    let carrier = form.file("image")?;
    let text = form.value("text")?;
    info!(
        "[{request_id}] 📤 invisible watermark: {} characters",
        text.chars().count()
    );

    let image = codec::load_image(carrier)?;
    let marked = watermark::add_invisible_watermark(&image, text)?;
    let png = codec::to_png_bytes(&marked)?;
    info!("[{request_id}] ✅ embedded, {} byte PNG", png.len());
    Ok(png_response(png))
}

/// `POST /watermark/invisible/extract`: recover a `WM:`-tagged payload.
pub async fn watermark_invisible_extract(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let request_id = Uuid::new_v4();
    let carrier = form.file("image")?;
    info!("[{request_id}] 📤 extract watermark: {} byte image", carrier.len());

    let image = codec::load_image(carrier)?;
    let watermark = watermark::extract_invisible_watermark(&image);
    info!("[{request_id}] ✅ extraction finished");
    Ok(Json(json!({ "watermark": watermark })).into_response())
}

/// `POST /compare`: MSE/PSNR report between two same-sized images.
pub async fn compare(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect(&mut multipart).await?;
    let original = codec::load_image(form.file("original")?)?;
    let modified = codec::load_image(form.file("modified")?)?;
    let report = watermark::compare_images(&original, &modified)?;
    Ok(Json(report).into_response())
}

/// Raw PNG success response.
fn png_response(png: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
}

/// JSON envelope with a base64 image and the step trace.
fn steps_image_response(png: &[u8], steps: Vec<Step>) -> Response {
    Json(json!({
        "success": true,
        "image": general_purpose::STANDARD.encode(png),
        "steps": steps,
    }))
    .into_response()
}
