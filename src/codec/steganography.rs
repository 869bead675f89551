//! # LSB Steganography
//!
//! Hides UTF-8 text in the least significant bit of an image's samples.
//!
//! ## Algorithm
//!
//! The message bytes are serialized MSB-first into a bit sequence and a
//! 16-bit terminator (`1111111111111110`) is appended. Each bit is written
//! into the LSB of one sample of the flattened RGBA buffer, in row-major
//! order across all four channels. Extraction reads the LSB of every
//! sample and searches the resulting bit stream for the terminator; the
//! bits before it are decoded as 8-bit groups.
//!
//! ## Capacity
//!
//! One bit per sample, so a `w` x `h` image holds `(w * h * 4 - 16) / 8`
//! message bytes. Output is always PNG: a lossy format would destroy the
//! bit plane.

use image::{DynamicImage, RgbaImage};
use serde::Serialize;

use super::{CodecError, Step};

/// End-of-message marker: fifteen ones followed by a zero.
pub const TERMINATOR: u16 = 0b1111_1111_1111_1110;

/// Number of bits in the terminator.
pub const TERMINATOR_BITS: usize = 16;

/// Result returned when extraction finds no terminator in the bit stream.
pub const NO_MESSAGE: &str = "No hidden message found";

/// How many sample conversions/modifications a step trace spells out.
const TRACE_SAMPLES: usize = 15;
const TRACE_CHARS: usize = 10;

/// Embed `message` into `image`, returning the stego image and a step trace.
///
/// # Errors
/// [`CodecError::Capacity`] when the message plus terminator needs more bits
/// than the image has samples.
pub fn encode_message(
    image: &DynamicImage,
    message: &str,
) -> Result<(RgbaImage, Vec<Step>), CodecError> {
    let mut steps = Vec::new();
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let total_samples = rgba.len();

    steps.push(Step::success(
        1,
        "Load pixel buffer",
        "The image is decoded into a flat buffer of 8-bit samples",
        format!(
            "Dimensions: {width}x{height}, 4 channels per pixel, {total_samples} samples total"
        ),
    ));

    let bits = message_bits(message);
    steps.push(Step::success(
        2,
        "Convert message to bits",
        "Each message byte becomes 8 bits, most significant first",
        char_conversion_detail(message),
    ));

    let required = bits.len() + TERMINATOR_BITS;
    steps.push(Step::success(
        3,
        "Append terminator",
        "A 16-bit end-of-message marker (1111111111111110) is appended",
        format!(
            "Message bits: {}, terminator bits: {TERMINATOR_BITS}, total: {required}",
            bits.len()
        ),
    ));

    if required > total_samples {
        steps.push(Step::error(
            4,
            "Validate capacity",
            "Check that the image has a sample for every bit",
            format!(
                "FAILED: {required} bits needed but only {total_samples} samples available"
            ),
        ));
        return Err(CodecError::Capacity {
            required,
            available: total_samples,
        });
    }
    let usage = required as f64 / total_samples as f64 * 100.0;
    steps.push(Step::success(
        4,
        "Validate capacity",
        "Check that the image has a sample for every bit",
        format!("Available: {total_samples} bits, needed: {required} bits, usage: {usage:.2}%"),
    ));

    let samples: &mut [u8] = &mut rgba;
    let mut modified = 0usize;
    let mut trace = Vec::new();
    for (i, bit) in bits
        .iter()
        .copied()
        .chain(terminator_bits())
        .enumerate()
    {
        let before = samples[i];
        samples[i] = (before & 0xFE) | bit;
        if samples[i] != before {
            modified += 1;
        }
        if trace.len() < TRACE_SAMPLES {
            let marker = if samples[i] != before { "changed" } else { "same" };
            trace.push(format!(
                "sample {i:4}: {before:3} ({before:08b}) -> {after:3} ({after:08b}) [bit={bit}] {marker}",
                after = samples[i]
            ));
        }
    }
    let unchanged = required - modified;
    steps.push(Step::success(
        5,
        "Write message bits into sample LSBs",
        "The LSB of each sample is replaced by the next message bit",
        format!(
            "Samples written: {required}\nChanged: {modified} ({:.1}%)\nAlready matching: {unchanged}\n\nFirst {} samples:\n{}",
            modified as f64 / required as f64 * 100.0,
            trace.len(),
            trace.join("\n")
        ),
    ));

    steps.push(Step::success(
        6,
        "Rebuild image",
        "The modified buffer is reassembled into an image ready to save as PNG",
        format!("Stego image ready ({width}x{height}, RGBA)"),
    ));

    Ok((rgba, steps))
}

/// Extract a hidden message from `image`, returning it with a step trace.
///
/// When no terminator is present the sentinel [`NO_MESSAGE`] is returned as
/// the message; absence of a payload is a result, not an error.
pub fn decode_message(image: &DynamicImage) -> (String, Vec<Step>) {
    let mut steps = Vec::new();
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let samples: &[u8] = &rgba;

    steps.push(Step::success(
        1,
        "Load stego image",
        "The carrier image is decoded into a flat buffer of 8-bit samples",
        format!("Dimensions: {width}x{height}, {} samples total", samples.len()),
    ));

    let mut extraction_trace = Vec::new();
    for (i, &sample) in samples.iter().take(TRACE_SAMPLES).enumerate() {
        extraction_trace.push(format!(
            "sample {i:4}: value={sample:3} ({sample:08b}) -> LSB = {}",
            sample & 1
        ));
    }
    steps.push(Step::success(
        2,
        "Extract sample LSBs",
        "The least significant bit of every sample is read in order",
        format!(
            "Bits extracted: {}\n\nFirst {} samples:\n{}",
            samples.len(),
            extraction_trace.len(),
            extraction_trace.join("\n")
        ),
    ));

    // Slide a 16-bit window over the LSB stream looking for the terminator.
    let mut window: u16 = 0;
    let mut message_bits_len: Option<usize> = None;
    for (i, &sample) in samples.iter().enumerate() {
        window = (window << 1) | (sample & 1) as u16;
        if i + 1 >= TERMINATOR_BITS && window == TERMINATOR {
            message_bits_len = Some(i + 1 - TERMINATOR_BITS);
            break;
        }
    }

    let Some(bit_len) = message_bits_len else {
        steps.push(Step::error(
            3,
            "Find terminator",
            "Search the bit stream for the end-of-message marker",
            "Terminator not found: the image carries no hidden message".to_string(),
        ));
        return (NO_MESSAGE.to_string(), steps);
    };

    steps.push(Step::success(
        3,
        "Find terminator",
        "Search the bit stream for the end-of-message marker",
        format!("Terminator found at bit {bit_len}; message length: {bit_len} bits"),
    ));

    steps.push(Step::success(
        4,
        "Isolate message bits",
        "The bits before the terminator form the message",
        format!(
            "{bit_len} bits, {} complete bytes (8 bits per byte)",
            bit_len / 8
        ),
    ));

    let mut bytes = Vec::with_capacity(bit_len / 8);
    let mut conversion_trace = Vec::new();
    for chunk_start in (0..bit_len).step_by(8) {
        if chunk_start + 8 > bit_len {
            break;
        }
        let mut byte = 0u8;
        for offset in 0..8 {
            byte = (byte << 1) | (samples[chunk_start + offset] & 1);
        }
        if conversion_trace.len() < TRACE_CHARS {
            let shown = char::from(byte);
            let display = if shown.is_ascii_graphic() || shown == ' ' {
                format!("'{shown}'")
            } else {
                format!("[{byte}]")
            };
            conversion_trace.push(format!("{byte:08b} -> {byte:3} -> {display}"));
        }
        bytes.push(byte);
    }
    let message = String::from_utf8_lossy(&bytes).into_owned();
    let preview = if message.chars().count() > 100 {
        let truncated: String = message.chars().take(100).collect();
        format!("{truncated}...")
    } else {
        message.clone()
    };

    steps.push(Step::success(
        5,
        "Convert bits to text",
        "Each 8-bit group is decoded back into a character",
        format!(
            "Decoded {} bytes\n\nFirst {} conversions:\n{}\n\nMessage: \"{preview}\"",
            bytes.len(),
            conversion_trace.len(),
            conversion_trace.join("\n")
        ),
    ));

    (message, steps)
}

/// Capacity report for a carrier image.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub total_samples: usize,
    pub max_bits: usize,
    pub max_bytes: usize,
    pub max_chars: usize,
}

/// Compute how much text `image` can carry.
pub fn capacity(image: &DynamicImage) -> CapacityReport {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let total_samples = rgba.len();
    let max_bits = total_samples.saturating_sub(TERMINATOR_BITS);
    let max_bytes = max_bits / 8;
    CapacityReport {
        width,
        height,
        channels: 4,
        total_samples,
        max_bits,
        max_bytes,
        max_chars: max_bytes,
    }
}

/// Serialize a message into its embedded bit sequence (without terminator).
fn message_bits(message: &str) -> Vec<u8> {
    let mut bits = Vec::with_capacity(message.len() * 8);
    for byte in message.bytes() {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}

/// The terminator as a bit iterator, MSB first.
fn terminator_bits() -> impl Iterator<Item = u8> {
    (0..TERMINATOR_BITS).map(|i| ((TERMINATOR >> (TERMINATOR_BITS - 1 - i)) & 1) as u8)
}

/// Per-character conversion summary for the encode trace.
fn char_conversion_detail(message: &str) -> String {
    let shown: Vec<String> = message
        .chars()
        .take(TRACE_CHARS)
        .map(|c| {
            let mut buf = [0u8; 4];
            let encoded = c.encode_utf8(&mut buf);
            let bits: Vec<String> = encoded.bytes().map(|b| format!("{b:08b}")).collect();
            format!("'{c}' = {}", bits.join(" "))
        })
        .collect();
    let remaining = message.chars().count().saturating_sub(TRACE_CHARS);
    let more = if remaining > 0 {
        format!("\n...and {remaining} more characters")
    } else {
        String::new()
    };
    format!(
        "Message length: {} characters, {} bits\n\n{}{more}",
        message.chars().count(),
        message.len() * 8,
        shown.join("\n")
    )
}
