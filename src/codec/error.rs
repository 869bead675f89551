//! Error taxonomy for the image processing core.

use thiserror::Error;

/// Failures produced by the steganography and watermarking codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("could not decode image data: {0}")]
    ImageDecode(image::ImageError),

    /// The message does not fit in the carrier image.
    #[error("message too long: needs {required} bits but the image only holds {available}")]
    Capacity { required: usize, available: usize },

    /// No TrueType font is available for text watermarking.
    #[error("no usable TrueType font found; set server.font_path")]
    FontUnavailable,

    /// The configured font file exists but is not a valid font.
    #[error("invalid font data: {0}")]
    FontData(ab_glyph::InvalidFont),

    /// A numeric parameter is outside its meaningful range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two images that must share dimensions do not.
    #[error("images have different dimensions: {0}x{1} vs {2}x{3}")]
    DimensionMismatch(u32, u32, u32, u32),

    /// The result image could not be serialized to PNG.
    #[error("could not encode PNG output: {0}")]
    PngEncode(image::ImageError),
}
