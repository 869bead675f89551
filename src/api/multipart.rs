//! Multipart form collection.
//!
//! Handlers receive a mix of file fields (the carrier image, a logo) and
//! text fields (message, position, opacity, scale). This module drains the
//! multipart stream once and exposes typed accessors with the defaults the
//! frontend relies on.

use axum::extract::Multipart;
use std::collections::HashMap;

use super::ApiError;
use crate::codec::watermark::{Position, DEFAULT_OPACITY, DEFAULT_SCALE};

/// All fields of one multipart request.
#[derive(Debug, Default)]
pub struct RequestForm {
    files: HashMap<String, Vec<u8>>,
    values: HashMap<String, String>,
}

/// Drain a multipart stream into a [`RequestForm`].
///
/// Fields with a filename are treated as file uploads; everything else is a
/// text value.
pub async fn collect(multipart: &mut Multipart) -> Result<RequestForm, ApiError> {
    let mut form = RequestForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read multipart data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }
        if field.file_name().is_some() {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read field {name}: {e}")))?;
            form.files.insert(name, data.to_vec());
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read field {name}: {e}")))?;
            form.values.insert(name, text);
        }
    }
    Ok(form)
}

impl RequestForm {
    /// A required file field.
    pub fn file(&self, name: &str) -> Result<&[u8], ApiError> {
        self.files
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ApiError::bad_request(format!("{name} file is required")))
    }

    /// A required text field.
    pub fn value(&self, name: &str) -> Result<&str, ApiError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::bad_request(format!("{name} is required")))
    }

    /// Watermark placement; missing or unrecognized falls back to
    /// bottom-right.
    pub fn position(&self) -> Position {
        self.values
            .get("position")
            .map(|v| Position::parse(v))
            .unwrap_or(Position::BottomRight)
    }

    /// Watermark opacity (0-255), default 128.
    pub fn opacity(&self) -> Result<u8, ApiError> {
        match self.values.get("opacity") {
            None => Ok(DEFAULT_OPACITY),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ApiError::bad_request(format!("invalid opacity: {raw}"))),
        }
    }

    /// Logo scale as a fraction of the base width, default 0.2.
    pub fn scale(&self) -> Result<f32, ApiError> {
        match self.values.get("scale") {
            None => Ok(DEFAULT_SCALE),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ApiError::bad_request(format!("invalid scale: {raw}"))),
        }
    }

    /// Whether the client asked for the step-by-step trace response.
    pub fn wants_steps(&self) -> bool {
        matches!(
            self.values.get("steps").map(String::as_str),
            Some("true") | Some("1") | Some("yes")
        )
    }
}
