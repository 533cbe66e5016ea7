//! Render requests: input validation, URL normalization and style.

use crate::color::Color;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Scheme prefixes that mark text as already addressable.
pub const RECOGNIZED_SCHEMES: &[&str] = &["http://", "https://", "tel:", "mailto:", "wifi:"];

/// Prefix added to bare domains.
pub const DEFAULT_SCHEME: &str = "https://";

/// Sizes offered by the size selector, in pixels.
pub const SIZE_CHOICES: &[u32] = &[150, 200, 250, 300, 400, 500, 600, 800, 1000];

/// Trim the input and reject empty or whitespace-only text.
pub fn validate(raw: &str) -> Result<&str, PipelineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation);
    }
    Ok(trimmed)
}

/// Prefix `https://` onto text that looks like a bare domain.
///
/// Text that already starts with a recognized scheme, or that has no `.`,
/// is returned unchanged. This is a heuristic and does not parse URLs.
pub fn normalize(text: &str) -> Cow<'_, str> {
    let has_scheme = RECOGNIZED_SCHEMES.iter().any(|s| text.starts_with(s));
    if !has_scheme && text.contains('.') {
        Cow::Owned(format!("{DEFAULT_SCHEME}{text}"))
    } else {
        Cow::Borrowed(text)
    }
}

/// A pixel size picked from [`SIZE_CHOICES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QrSize(u32);

impl QrSize {
    /// Validate a pixel size against the enumerated choices.
    pub fn new(pixels: u32) -> Result<Self, SizeError> {
        if SIZE_CHOICES.contains(&pixels) {
            Ok(Self(pixels))
        } else {
            Err(SizeError::Unsupported(pixels))
        }
    }

    pub fn pixels(self) -> u32 {
        self.0
    }
}

impl Default for QrSize {
    fn default() -> Self {
        Self(300)
    }
}

impl fmt::Display for QrSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.0, self.0)
    }
}

impl TryFrom<u32> for QrSize {
    type Error = SizeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QrSize> for u32 {
    fn from(size: QrSize) -> Self {
        size.0
    }
}

/// Style parameters for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    /// Module color.
    #[serde(default = "default_dark")]
    pub dark: Color,

    /// Background color.
    #[serde(default = "default_light")]
    pub light: Color,

    /// Output size.
    #[serde(default)]
    pub size: QrSize,
}

fn default_dark() -> Color {
    Color::DEFAULT_DARK
}

fn default_light() -> Color {
    Color::DEFAULT_LIGHT
}

impl Default for Style {
    fn default() -> Self {
        Self {
            dark: default_dark(),
            light: default_light(),
            size: QrSize::default(),
        }
    }
}

/// Text and style parameters for one render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Monotonic request id; later triggers have larger ids.
    pub id: u64,
    /// Text as handed to the pipeline.
    pub raw: String,
    /// Trimmed text that is actually rendered.
    pub text: String,
    /// Colors and size.
    pub style: Style,
    /// Whether the triggering control shows a busy state.
    pub show_loading_indicator: bool,
}

impl PendingRequest {
    /// Build a request, rejecting empty text.
    pub fn new(
        id: u64,
        raw: impl Into<String>,
        style: Style,
        show_loading_indicator: bool,
    ) -> Result<Self, PipelineError> {
        let raw = raw.into();
        let text = validate(&raw)?.to_string();
        Ok(Self {
            id,
            raw,
            text,
            style,
            show_loading_indicator,
        })
    }
}

/// Errors that can occur when choosing a size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeError {
    /// Size is not one of the offered choices.
    #[error("Unsupported size {0}px (choose one of 150, 200, 250, 300, 400, 500, 600, 800, 1000)")]
    Unsupported(u32),
}
