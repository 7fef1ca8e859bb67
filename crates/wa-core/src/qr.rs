//! # QR Normalizer
//!
//! The gateway hands back the login QR code in one of four encodings:
//! a binary image blob, a data URI, a remote URL, or bare base64. Presenters
//! only ever see one canonical form, an [`ImageRef`] that can be displayed
//! directly.
//!
//! Precedence:
//! 1. Binary blob → `data:<mime>;base64,<payload>`
//! 2. `data:` string → as-is
//! 3. `http://` / `https://` string → as-is (remote reference, not embedded)
//! 4. Base64 character class → whitespace stripped, wrapped as a PNG data URI
//! 5. Anything else → passed through unchanged
//!
//! An empty result is an error: an empty QR must never be shown as success.

use std::fmt;

use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MIME type assumed when a blob arrives without a content type.
const DEFAULT_IMAGE_MIME: &str = "image/png";

/// QR normalization failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QrError {
    /// The payload normalized to nothing.
    #[error("QR code payload was empty")]
    EmptyPayload,
}

/// Raw QR payload as received from the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QrPayload {
    /// A string: base64, data URI, or remote URL.
    Text(String),
    /// A binary image with its optional content type.
    Blob {
        /// Raw image bytes.
        bytes: Bytes,
        /// `Content-Type` reported alongside the bytes.
        content_type: Option<String>,
    },
}

impl QrPayload {
    /// Build a text payload.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build a blob payload.
    pub fn blob(bytes: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self::Blob {
            bytes: bytes.into(),
            content_type: content_type.map(ToString::to_string),
        }
    }
}

/// A normalized, directly displayable image reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Borrow the reference as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the image is embedded (data URI) rather than remote.
    pub fn is_embedded(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A QR code ready for display. Replaced wholesale, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrArtifact {
    /// Normalized image reference.
    pub image_ref: ImageRef,
    /// When the artifact was produced.
    pub captured_at: DateTime<Utc>,
}

impl QrArtifact {
    /// Wrap an image reference captured now.
    pub fn new(image_ref: ImageRef) -> Self {
        Self {
            image_ref,
            captured_at: Utc::now(),
        }
    }

    /// Normalize a payload and stamp it with the current time.
    pub fn from_payload(payload: QrPayload) -> Result<Self, QrError> {
        normalize(payload).map(Self::new)
    }
}

/// Normalize any QR payload into an [`ImageRef`].
pub fn normalize(payload: QrPayload) -> Result<ImageRef, QrError> {
    let normalized = match payload {
        QrPayload::Blob {
            bytes,
            content_type,
        } => {
            if bytes.is_empty() {
                return Err(QrError::EmptyPayload);
            }
            let mime = content_type
                .as_deref()
                .and_then(|ct| ct.split(';').next())
                .map(str::trim)
                .filter(|ct| !ct.is_empty())
                .unwrap_or(DEFAULT_IMAGE_MIME);
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            format!("data:{mime};base64,{encoded}")
        }
        QrPayload::Text(text) => normalize_text(&text),
    };

    if normalized.trim().is_empty() {
        return Err(QrError::EmptyPayload);
    }
    Ok(ImageRef(normalized))
}

fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("data:") {
        return trimmed.to_string();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    if is_base64_class(trimmed) {
        let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        return format!("data:{DEFAULT_IMAGE_MIME};base64,{compact}");
    }
    text.to_string()
}

fn is_base64_class(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=') || c.is_whitespace())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
