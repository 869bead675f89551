//! # Stegomark
//!
//! HTTP service for hiding messages in images and marking image ownership.
//!
//! ## Components
//!
//! - [`codec`]: the image processing core. LSB steganography, visible text
//!   and logo watermarks, invisible (bit-plane) watermarks, and image
//!   quality comparison.
//! - [`api`]: axum router and request handlers exposing the codec over
//!   multipart HTTP endpoints
//! - [`common`]: configuration loading shared by the binary and tests

pub mod api;
pub mod codec;
pub mod common;
