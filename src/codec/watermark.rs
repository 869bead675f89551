//! # Watermarking
//!
//! Visible and invisible ownership marks on images.
//!
//! - **Visible text**: white text rasterized onto a transparent overlay and
//!   alpha-composited over the image.
//! - **Visible logo**: a second image scaled, made translucent, and blended
//!   onto the base at a chosen corner.
//! - **Invisible**: the text is prefixed with `WM:` and hidden in the LSB
//!   plane via the steganography codec.
//!
//! Comparison utilities (MSE/PSNR) quantify how much a mark changed the
//! carrier.

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::{steganography, CodecError, Step};

/// Margin in pixels between a watermark and the image edge.
pub const MARGIN: i64 = 20;

/// Prefix identifying an invisible watermark payload.
pub const WATERMARK_PREFIX: &str = "WM:";

/// Result returned when extraction finds no watermark.
pub const NO_WATERMARK: &str = "No watermark found";

/// Default watermark opacity (0-255).
pub const DEFAULT_OPACITY: u8 = 128;

/// Default logo scale as a fraction of the base image width.
pub const DEFAULT_SCALE: f32 = 0.2;

/// System font locations tried when no font path is configured.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Placement of a visible watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    /// Parse a form value; anything unrecognized falls back to bottom-right.
    pub fn parse(value: &str) -> Self {
        match value {
            "top-left" => Position::TopLeft,
            "top-right" => Position::TopRight,
            "bottom-left" => Position::BottomLeft,
            "bottom-right" => Position::BottomRight,
            "center" => Position::Center,
            _ => Position::BottomRight,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
            Position::Center => "center",
        }
    }

    /// Top-left coordinate for an item of `item` size placed on a `base`
    /// sized canvas. Coordinates can be negative when the item is larger
    /// than the base; drawing clips.
    pub fn anchor(self, base: (u32, u32), item: (u32, u32)) -> (i64, i64) {
        let (bw, bh) = (base.0 as i64, base.1 as i64);
        let (iw, ih) = (item.0 as i64, item.1 as i64);
        match self {
            Position::TopLeft => (MARGIN, MARGIN),
            Position::TopRight => (bw - iw - MARGIN, MARGIN),
            Position::BottomLeft => (MARGIN, bh - ih - MARGIN),
            Position::BottomRight => (bw - iw - MARGIN, bh - ih - MARGIN),
            Position::Center => ((bw - iw) / 2, (bh - ih) / 2),
        }
    }
}

/// Load the watermark font.
///
/// A configured path wins; otherwise well-known system locations are tried.
pub fn load_font(configured: Option<&Path>) -> Result<FontVec, CodecError> {
    if let Some(path) = configured {
        let bytes = fs::read(path).map_err(|_| CodecError::FontUnavailable)?;
        return FontVec::try_from_vec(bytes).map_err(CodecError::FontData);
    }
    for candidate in SYSTEM_FONT_PATHS {
        if let Ok(bytes) = fs::read(candidate) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                return Ok(font);
            }
        }
    }
    Err(CodecError::FontUnavailable)
}

/// Stamp translucent white text onto `image`.
///
/// Font size is 5% of the smaller image dimension. Returns the flattened
/// RGB result and a step trace.
pub fn add_text_watermark(
    image: &DynamicImage,
    text: &str,
    position: Position,
    opacity: u8,
    font: &FontVec,
) -> Result<(RgbImage, Vec<Step>), CodecError> {
    let mut steps = Vec::new();
    let mut base = image.to_rgba8();
    let (width, height) = base.dimensions();

    steps.push(Step::success(
        1,
        "Duplicate original image",
        "The watermark is applied to a copy; the upload stays untouched",
        format!("Size: {width}x{height} pixels, RGBA working copy"),
    ));

    let mut overlay = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
    steps.push(Step::success(
        2,
        "Create transparent overlay",
        "An RGBA layer with alpha 0 receives the watermark text",
        format!("Overlay size: {width}x{height}, fully transparent"),
    ));

    let font_size = (width.min(height) as f32 * 0.05).max(8.0);
    let scale = PxScale::from(font_size);
    steps.push(Step::success(
        3,
        "Configure font",
        "Font size is 5% of the smaller image dimension",
        format!("Size: {font_size:.0}px"),
    ));

    let (text_w, text_h) = text_size(scale, font, text);
    let (x, y) = position.anchor((width, height), (text_w, text_h));
    steps.push(Step::success(
        4,
        "Compute watermark position",
        "The anchor is derived from the chosen corner and a fixed margin",
        position_table(position, (width, height), (text_w, text_h)),
    ));

    draw_text_mut(
        &mut overlay,
        Rgba([255, 255, 255, opacity]),
        x as i32,
        y as i32,
        scale,
        font,
        text,
    );
    steps.push(Step::success(
        5,
        "Draw watermark text",
        "The text is rendered onto the overlay in white",
        format!(
            "Text: \"{text}\"\nColor: white (255, 255, 255)\nOpacity: {opacity}/255 ({:.1}%)",
            opacity as f64 / 255.0 * 100.0
        ),
    ));

    let sample = clamp_point(
        (x + text_w as i64 / 2, y + text_h as i64 / 2),
        (width, height),
    );
    let before = *base.get_pixel(sample.0, sample.1);
    imageops::overlay(&mut base, &overlay, 0, 0);
    let after = *base.get_pixel(sample.0, sample.1);
    steps.push(Step::success(
        6,
        "Alpha composite",
        "The overlay is blended over the image: result = fg * a + bg * (1 - a)",
        blend_detail(sample, before, [255, 255, 255], opacity, after),
    ));

    let result = DynamicImage::ImageRgba8(base).to_rgb8();
    steps.push(Step::success(
        7,
        "Flatten to RGB",
        "The composited RGBA image is flattened for broad compatibility",
        format!("Mode: RGBA -> RGB, size {width}x{height}"),
    ));

    Ok((result, steps))
}

/// Blend a logo onto `base_image` at the chosen position.
///
/// The logo is resized to `scale` times the base width (aspect preserved,
/// Lanczos3) and its alpha channel is multiplied by `opacity / 255`.
pub fn add_logo_watermark(
    base_image: &DynamicImage,
    logo_image: &DynamicImage,
    position: Position,
    opacity: u8,
    scale: f32,
) -> Result<(RgbImage, Vec<Step>), CodecError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CodecError::InvalidParameter(format!(
            "scale must be a positive number, got {scale}"
        )));
    }

    let mut steps = Vec::new();
    let mut base = base_image.to_rgba8();
    let (width, height) = base.dimensions();

    steps.push(Step::success(
        1,
        "Duplicate base image",
        "The watermark is applied to a copy; the upload stays untouched",
        format!("Size: {width}x{height} pixels, RGBA working copy"),
    ));

    let aspect = logo_image.width() as f32 / logo_image.height().max(1) as f32;
    let wm_width = ((width as f32 * scale) as u32).max(1);
    let wm_height = ((wm_width as f32 / aspect) as u32).max(1);
    let mut logo = imageops::resize(
        &logo_image.to_rgba8(),
        wm_width,
        wm_height,
        FilterType::Lanczos3,
    );
    steps.push(Step::success(
        2,
        "Resize logo",
        "The logo is scaled relative to the base width, keeping its aspect ratio",
        format!(
            "Original: {}x{}\nScale: {:.0}% of base width\nNew size: {wm_width}x{wm_height}\nAspect ratio: {aspect:.2}\nResampling: Lanczos3",
            logo_image.width(),
            logo_image.height(),
            scale * 100.0
        ),
    ));

    for pixel in logo.pixels_mut() {
        pixel[3] = (pixel[3] as u16 * opacity as u16 / 255) as u8;
    }
    steps.push(Step::success(
        3,
        "Apply logo opacity",
        "The logo alpha channel is multiplied by the opacity factor",
        format!(
            "Opacity: {opacity}/255 ({:.1}%)\nFormula: new_alpha = alpha * ({opacity} / 255)",
            opacity as f64 / 255.0 * 100.0
        ),
    ));

    let (x, y) = position.anchor((width, height), (wm_width, wm_height));
    steps.push(Step::success(
        4,
        "Compute paste position",
        "The anchor is derived from the chosen corner and a fixed margin",
        position_table(position, (width, height), (wm_width, wm_height)),
    ));

    let sample = clamp_point(
        (x + wm_width as i64 / 2, y + wm_height as i64 / 2),
        (width, height),
    );
    let before = *base.get_pixel(sample.0, sample.1);
    let logo_sample = (
        (sample.0 as i64 - x).clamp(0, wm_width as i64 - 1) as u32,
        (sample.1 as i64 - y).clamp(0, wm_height as i64 - 1) as u32,
    );
    let logo_pixel = *logo.get_pixel(logo_sample.0, logo_sample.1);
    imageops::overlay(&mut base, &logo, x, y);
    let after = *base.get_pixel(sample.0, sample.1);
    steps.push(Step::success(
        5,
        "Blend logo onto base",
        "The logo alpha channel acts as the blend mask: result = logo * a + bg * (1 - a)",
        blend_detail(
            sample,
            before,
            [logo_pixel[0], logo_pixel[1], logo_pixel[2]],
            logo_pixel[3],
            after,
        ),
    ));

    let result = DynamicImage::ImageRgba8(base).to_rgb8();
    steps.push(Step::success(
        6,
        "Flatten to RGB",
        "The composited RGBA image is flattened for broad compatibility",
        format!("Mode: RGBA -> RGB, size {width}x{height}"),
    ));

    Ok((result, steps))
}

/// Hide `text` in the image's LSB plane, tagged with the `WM:` prefix.
pub fn add_invisible_watermark(
    image: &DynamicImage,
    text: &str,
) -> Result<RgbaImage, CodecError> {
    let tagged = format!("{WATERMARK_PREFIX}{text}");
    let (stego, _) = steganography::encode_message(image, &tagged)?;
    Ok(stego)
}

/// Recover an invisible watermark, or [`NO_WATERMARK`] when the image
/// carries no `WM:`-tagged payload.
pub fn extract_invisible_watermark(image: &DynamicImage) -> String {
    let (message, _) = steganography::decode_message(image);
    match message.strip_prefix(WATERMARK_PREFIX) {
        Some(watermark) => watermark.to_string(),
        None => NO_WATERMARK.to_string(),
    }
}

/// Quality comparison between an original and a processed image.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub mse: f64,
    /// Peak signal-to-noise ratio in dB; `None` when the images are identical.
    pub psnr: Option<f64>,
    pub identical: bool,
    pub diff_samples: usize,
    pub total_samples: usize,
    pub diff_percent: f64,
}

/// Compute MSE/PSNR and the fraction of differing samples.
///
/// # Errors
/// [`CodecError::DimensionMismatch`] when the images differ in size.
pub fn compare_images(
    original: &DynamicImage,
    modified: &DynamicImage,
) -> Result<ComparisonReport, CodecError> {
    let a = original.to_rgba8();
    let b = modified.to_rgba8();
    if a.dimensions() != b.dimensions() {
        return Err(CodecError::DimensionMismatch(
            a.width(),
            a.height(),
            b.width(),
            b.height(),
        ));
    }

    let total_samples = a.len();
    let mut sum_sq = 0.0f64;
    let mut diff_samples = 0usize;
    for (&sa, &sb) in a.iter().zip(b.iter()) {
        let diff = sa as f64 - sb as f64;
        sum_sq += diff * diff;
        if sa != sb {
            diff_samples += 1;
        }
    }
    let mse = sum_sq / total_samples as f64;
    let psnr = if mse == 0.0 {
        None
    } else {
        Some(20.0 * (255.0 / mse.sqrt()).log10())
    };

    Ok(ComparisonReport {
        mse,
        psnr,
        identical: diff_samples == 0,
        diff_samples,
        total_samples,
        diff_percent: diff_samples as f64 / total_samples as f64 * 100.0,
    })
}

/// Render the position table shown in step traces, marking the chosen entry.
fn position_table(chosen: Position, base: (u32, u32), item: (u32, u32)) -> String {
    let rows: Vec<String> = Position::ALL
        .iter()
        .map(|p| {
            let (x, y) = p.anchor(base, item);
            let marker = if *p == chosen { "  <- chosen" } else { "" };
            format!("  {:13}: ({x}, {y}){marker}", p.label())
        })
        .collect();
    let (fx, fy) = chosen.anchor(base, item);
    format!(
        "Item size: {}x{} pixels\nMargin: {MARGIN}px\n\nAvailable positions:\n{}\n\nFinal coordinates: ({fx}, {fy})",
        item.0,
        item.1,
        rows.join("\n")
    )
}

/// Spell out the alpha blend at one sampled pixel for the step trace.
fn blend_detail(
    coord: (u32, u32),
    before: Rgba<u8>,
    foreground: [u8; 3],
    alpha: u8,
    after: Rgba<u8>,
) -> String {
    let a = alpha as f64 / 255.0;
    let mut lines = Vec::new();
    lines.push(format!("Sampled pixel at ({}, {}):", coord.0, coord.1));
    lines.push(format!(
        "Background: RGB({}, {}, {})",
        before[0], before[1], before[2]
    ));
    lines.push(format!(
        "Foreground: RGB({}, {}, {}) with alpha {alpha}/255 ({:.1}%)",
        foreground[0],
        foreground[1],
        foreground[2],
        a * 100.0
    ));
    lines.push("Formula: result = fg * a + bg * (1 - a)".to_string());
    for (channel, label) in ["R", "G", "B"].iter().enumerate() {
        let expected = foreground[channel] as f64 * a + before[channel] as f64 * (1.0 - a);
        lines.push(format!(
            "  {label} = {} * {a:.3} + {} * {:.3} = {expected:.2}",
            foreground[channel],
            before[channel],
            1.0 - a
        ));
    }
    lines.push(format!(
        "Result: RGB({}, {}, {})\nDelta: ({:+}, {:+}, {:+})",
        after[0],
        after[1],
        after[2],
        after[0] as i32 - before[0] as i32,
        after[1] as i32 - before[1] as i32,
        after[2] as i32 - before[2] as i32,
    ));
    lines.join("\n")
}

/// Clamp a possibly out-of-bounds coordinate into the image.
fn clamp_point(point: (i64, i64), bounds: (u32, u32)) -> (u32, u32) {
    (
        point.0.clamp(0, bounds.0 as i64 - 1) as u32,
        point.1.clamp(0, bounds.1 as i64 - 1) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn base_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([10, 20, 30, 255]),
        ))
    }

    #[test]
    fn anchors_cover_all_corners() {
        let base = (200, 100);
        let item = (40, 10);
        assert_eq!(Position::TopLeft.anchor(base, item), (20, 20));
        assert_eq!(Position::TopRight.anchor(base, item), (140, 20));
        assert_eq!(Position::BottomLeft.anchor(base, item), (20, 70));
        assert_eq!(Position::BottomRight.anchor(base, item), (140, 70));
        assert_eq!(Position::Center.anchor(base, item), (80, 45));
    }

    #[test]
    fn anchor_can_go_negative_for_oversized_items() {
        let (x, y) = Position::BottomRight.anchor((50, 50), (100, 100));
        assert!(x < 0 && y < 0);
    }

    #[test]
    fn unknown_position_falls_back_to_bottom_right() {
        assert_eq!(Position::parse("middle-ish"), Position::BottomRight);
        assert_eq!(Position::parse("center"), Position::Center);
        assert_eq!(Position::parse("top-left"), Position::TopLeft);
    }

    #[test]
    fn logo_watermark_changes_the_target_corner() {
        let base = base_image(100, 100);
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            50,
            50,
            Rgba([255, 255, 255, 255]),
        ));

        let (marked, steps) =
            add_logo_watermark(&base, &logo, Position::TopLeft, 255, 0.2).unwrap();
        assert_eq!(steps.len(), 6);

        // 20x20 logo pasted at (20, 20): inside changed, far corner untouched.
        let inside = marked.get_pixel(30, 30);
        let outside = marked.get_pixel(90, 90);
        assert_eq!(inside.0, [255, 255, 255]);
        assert_eq!(outside.0, [10, 20, 30]);
    }

    #[test]
    fn logo_opacity_halves_the_blend() {
        let base = base_image(100, 100);
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            50,
            50,
            Rgba([255, 255, 255, 255]),
        ));

        let (marked, _) =
            add_logo_watermark(&base, &logo, Position::TopLeft, 128, 0.2).unwrap();
        let inside = marked.get_pixel(30, 30);
        // result = 255 * (128/255) + bg * (1 - 128/255), roughly halfway.
        assert!(inside.0[0] > 120 && inside.0[0] < 145, "got {:?}", inside.0);
    }

    #[test]
    fn logo_watermark_rejects_nonpositive_scale() {
        let base = base_image(50, 50);
        let logo = base_image(10, 10);
        assert!(matches!(
            add_logo_watermark(&base, &logo, Position::Center, 128, 0.0),
            Err(CodecError::InvalidParameter(_))
        ));
        assert!(matches!(
            add_logo_watermark(&base, &logo, Position::Center, 128, f32::NAN),
            Err(CodecError::InvalidParameter(_))
        ));
    }

    #[test]
    fn invisible_watermark_roundtrips() {
        let base = base_image(32, 32);
        let marked = add_invisible_watermark(&base, "owner-2024").unwrap();
        let extracted =
            extract_invisible_watermark(&DynamicImage::ImageRgba8(marked));
        assert_eq!(extracted, "owner-2024");
    }

    #[test]
    fn plain_image_has_no_watermark() {
        // Constant pixels: the LSB stream never contains the terminator.
        let base = base_image(32, 32);
        assert_eq!(extract_invisible_watermark(&base), NO_WATERMARK);
    }

    #[test]
    fn untagged_message_is_not_a_watermark() {
        let base = base_image(32, 32);
        let (stego, _) = steganography::encode_message(&base, "just a secret").unwrap();
        let extracted =
            extract_invisible_watermark(&DynamicImage::ImageRgba8(stego));
        assert_eq!(extracted, NO_WATERMARK);
    }

    #[test]
    fn compare_identical_images() {
        let a = base_image(16, 16);
        let report = compare_images(&a, &a).unwrap();
        assert!(report.identical);
        assert_eq!(report.mse, 0.0);
        assert!(report.psnr.is_none());
        assert_eq!(report.diff_samples, 0);
    }

    #[test]
    fn compare_detects_differences() {
        let a = base_image(16, 16);
        let mut b = a.to_rgba8();
        b.get_pixel_mut(0, 0)[0] += 1;
        let report = compare_images(&a, &DynamicImage::ImageRgba8(b)).unwrap();
        assert!(!report.identical);
        assert_eq!(report.diff_samples, 1);
        assert!(report.mse > 0.0);
        assert!(report.psnr.unwrap() > 40.0);
    }

    #[test]
    fn compare_rejects_size_mismatch() {
        let a = base_image(16, 16);
        let b = base_image(8, 8);
        assert!(matches!(
            compare_images(&a, &b),
            Err(CodecError::DimensionMismatch(16, 16, 8, 8))
        ));
    }

    #[test]
    fn text_watermark_brightens_the_target_area() {
        // Needs a system font; skip quietly on hosts without one.
        let Ok(font) = load_font(None) else {
            return;
        };
        let base = base_image(200, 200);
        let (marked, steps) =
            add_text_watermark(&base, "SAMPLE", Position::Center, 255, &font).unwrap();
        assert_eq!(steps.len(), 7);

        // White text over a dark background must brighten some pixel.
        let brightened = marked.pixels().any(|p| p.0[0] > 200);
        assert!(brightened);

        // Corners stay untouched for a centered watermark.
        assert_eq!(marked.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
