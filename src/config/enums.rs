//! Configuration enum types.

use crate::draw::{Color, color::*};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Color specification - either a named color or RGB values.
///
/// # Examples
/// ```toml
/// # Named color
/// color = "green"
///
/// # Custom RGB color (0-255 per component)
/// color = [0, 255, 0]
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Named color: red, green, blue, yellow, orange, pink, white, black (English or Spanish)
    Name(String),
    /// RGB color as [red, green, blue] where each component is 0-255
    Rgb([u8; 3]),
}

impl ColorSpec {
    /// Converts the color specification to a [`Color`] struct.
    ///
    /// Unknown color names fall back to `fallback` with a warning.
    pub fn to_color_or(&self, fallback: Color) -> Color {
        match self {
            ColorSpec::Name(name) => crate::util::name_to_color(name).unwrap_or_else(|| {
                warn!("Unknown color '{}', using {}", name, crate::util::color_to_name(&fallback));
                fallback
            }),
            ColorSpec::Rgb([r, g, b]) => Color::from_rgb8(*r, *g, *b),
        }
    }

    /// Converts to a [`Color`], falling back to green (the default pen) for unknown names.
    pub fn to_color(&self) -> Color {
        self.to_color_or(GREEN)
    }
}

/// Where session files are stored.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStorageMode {
    /// `$XDG_DATA_HOME/airscriber`
    Auto,
    /// Next to the configuration file
    Config,
    /// `session.custom_directory`
    Custom,
}

/// Compression preference for session files.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SessionCompression {
    /// Compress when the payload exceeds `auto_compress_threshold_kb`
    Auto,
    On,
    Off,
}
