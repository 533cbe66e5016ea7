//! Colors and the preset palette.
//!
//! Colors are plain RGB triples parsed from CSS-style hex strings and always
//! displayed as upper-case `#RRGGBB`, matching the hex readout shown next to
//! each color picker.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Create a color from its components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Default dark (module) color.
    pub const DEFAULT_DARK: Self = Self::rgb(0x1a, 0x1a, 0x4e);

    /// Default light (background) color.
    pub const DEFAULT_LIGHT: Self = Self::rgb(0xff, 0xff, 0xff);

    /// RGBA pixel value, fully opaque.
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xff]
    }

    /// Upper-case `#RRGGBB` form.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^#?([0-9a-fA-F]{6}|[0-9a-fA-F]{3})$").map_err(|_| {
            ColorError::Invalid(s.to_string())
        })?;
        let digits = re
            .captures(s.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ColorError::Invalid(s.to_string()))?;

        let component = |hex: &str| {
            u8::from_str_radix(hex, 16).map_err(|_| ColorError::Invalid(s.to_string()))
        };

        if digits.len() == 3 {
            // #rgb expands each nibble: #abc == #aabbcc
            let mut parts = [0u8; 3];
            for (slot, ch) in parts.iter_mut().zip(digits.chars()) {
                *slot = component(&format!("{ch}{ch}"))?;
            }
            Ok(Self::rgb(parts[0], parts[1], parts[2]))
        } else {
            Ok(Self::rgb(
                component(&digits[0..2])?,
                component(&digits[2..4])?,
                component(&digits[4..6])?,
            ))
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// A named dark/light color pair offered in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub label: &'static str,
    pub dark: Color,
    pub light: Color,
}

/// The fixed preset palette. The first entry is active initially.
pub static PRESETS: [Preset; 8] = [
    Preset {
        label: "Navy",
        dark: Color::rgb(0x1a, 0x1a, 0x4e),
        light: Color::rgb(0xff, 0xff, 0xff),
    },
    Preset {
        label: "Purple",
        dark: Color::rgb(0x6b, 0x21, 0xa8),
        light: Color::rgb(0xff, 0xff, 0xff),
    },
    Preset {
        label: "Teal",
        dark: Color::rgb(0x14, 0xb8, 0xa6),
        light: Color::rgb(0xff, 0xff, 0xff),
    },
    Preset {
        label: "Dark",
        dark: Color::rgb(0x0f, 0x17, 0x2a),
        light: Color::rgb(0xf1, 0xf5, 0xf9),
    },
    Preset {
        label: "Red",
        dark: Color::rgb(0xdc, 0x26, 0x26),
        light: Color::rgb(0xff, 0xf7, 0xf7),
    },
    Preset {
        label: "Green",
        dark: Color::rgb(0x16, 0xa3, 0x4a),
        light: Color::rgb(0xf0, 0xfd, 0xf4),
    },
    Preset {
        label: "Amber",
        dark: Color::rgb(0xd9, 0x77, 0x06),
        light: Color::rgb(0xff, 0xfb, 0xeb),
    },
    Preset {
        label: "Blue",
        dark: Color::rgb(0x1d, 0x4e, 0xd8),
        light: Color::rgb(0xef, 0xf6, 0xff),
    },
];

/// Look up a preset by label, ignoring case.
pub fn find_preset(label: &str) -> Option<&'static Preset> {
    let label = label.trim();
    PRESETS.iter().find(|p| p.label.eq_ignore_ascii_case(label))
}

/// Errors that can occur when parsing colors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorError {
    /// Not a `#rgb` or `#rrggbb` hex color.
    #[error("Invalid color: {0} (expected #rrggbb)")]
    Invalid(String),
}
