//! # Image Processing Core
//!
//! Steganography and watermarking on in-memory images.
//!
//! ## Modules
//!
//! - [`steganography`]: LSB message embedding and extraction
//! - [`watermark`]: visible text/logo watermarks, invisible watermarks,
//!   and image quality comparison
//!
//! Every transformation can also produce a [`Step`] trace describing what
//! was done to the image, suitable for rendering in the frontend.

pub mod error;
pub mod steganography;
pub mod watermark;

pub use error::CodecError;

use serde::Serialize;

/// Outcome of a single processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// One entry in the step-by-step trace of a codec operation.
///
/// Traces are returned to the frontend so it can show how a message was
/// embedded or a watermark applied: which pixels changed, the capacity
/// arithmetic, the blend formula, and so on.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub step: u32,
    pub title: String,
    pub description: String,
    pub detail: String,
    pub status: StepStatus,
}

impl Step {
    pub fn success(
        step: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            step,
            title: title.into(),
            description: description.into(),
            detail: detail.into(),
            status: StepStatus::Success,
        }
    }

    pub fn error(
        step: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            step,
            title: title.into(),
            description: description.into(),
            detail: detail.into(),
            status: StepStatus::Error,
        }
    }
}

/// Encode an RGBA image buffer as PNG bytes.
///
/// PNG is the only output format: lossless storage is required to keep the
/// LSB plane intact, and it matches what the frontend downloads.
pub fn to_png_bytes(image: &image::RgbaImage) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(CodecError::PngEncode)?;
    Ok(bytes)
}

/// Encode an RGB image buffer as PNG bytes.
pub fn rgb_to_png_bytes(image: &image::RgbImage) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(CodecError::PngEncode)?;
    Ok(bytes)
}

/// Decode an uploaded image from raw bytes.
pub fn load_image(bytes: &[u8]) -> Result<image::DynamicImage, CodecError> {
    image::load_from_memory(bytes).map_err(CodecError::ImageDecode)
}
