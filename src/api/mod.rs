//! # HTTP API
//!
//! axum router and handlers for the steganography and watermarking
//! endpoints.
//!
//! ## Routes
//!
//! - `POST /steganography/encode` | `/decode` | `/capacity`
//! - `POST /watermark/visible` | `/image` | `/invisible/add` | `/invisible/extract`
//! - `POST /compare`
//! - `GET /api/health`
//!
//! Image-producing endpoints answer with raw PNG bytes; informational
//! endpoints answer with JSON. Any handler switches to a JSON envelope with
//! a base64 image and a step trace when the request carries `steps=true`.

pub mod error;
pub mod handlers;
pub mod multipart;

pub use error::ApiError;

use ab_glyph::FontVec;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::warn;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::codec::watermark::load_font;
use crate::common::config::ServerSettings;

/// Shared state for all request handlers.
pub struct AppState {
    /// Font for visible text watermarks; `None` when no font could be
    /// loaded at startup (text watermark requests then fail with 500).
    pub font: Option<FontVec>,
    pub settings: ServerSettings,
}

impl AppState {
    pub fn new(settings: ServerSettings) -> Self {
        let font = match load_font(settings.font_path.as_deref().map(Path::new)) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("⚠️ no watermark font loaded: {e}");
                None
            }
        };
        Self { font, settings }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.settings.static_dir.clone();
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/steganography/encode", post(handlers::stego_encode))
        .route("/steganography/decode", post(handlers::stego_decode))
        .route("/steganography/capacity", post(handlers::stego_capacity))
        .route("/watermark/visible", post(handlers::watermark_visible))
        .route("/watermark/image", post(handlers::watermark_image))
        .route(
            "/watermark/invisible/add",
            post(handlers::watermark_invisible_add),
        )
        .route(
            "/watermark/invisible/extract",
            post(handlers::watermark_invisible_extract),
        )
        .route("/compare", post(handlers::compare))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
