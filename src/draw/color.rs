//! RGBA pen and UI colors.

use serde::{Deserialize, Serialize};

/// An RGBA color with components in 0.0 - 1.0.
///
/// ```
/// use airscriber::draw::Color;
/// let pen = Color::from_rgb8(0, 255, 0);
/// assert_eq!(pen, airscriber::draw::GREEN);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    /// 0.0 = fully transparent, 1.0 = opaque
    pub a: f64,
}

impl Color {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    const fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Creates an opaque color from 0-255 RGB components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::opaque(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    /// Perceived brightness (Rec. 601 weights), ignoring alpha.
    pub fn luminance(&self) -> f64 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    /// Applies this color as the cairo source.
    pub fn apply(&self, ctx: &cairo::Context) {
        ctx.set_source_rgba(self.r, self.g, self.b, self.a);
    }
}

pub const RED: Color = Color::opaque(1.0, 0.0, 0.0);
pub const GREEN: Color = Color::opaque(0.0, 1.0, 0.0);
pub const BLUE: Color = Color::opaque(0.0, 0.0, 1.0);
pub const YELLOW: Color = Color::opaque(1.0, 1.0, 0.0);
pub const ORANGE: Color = Color::opaque(1.0, 0.5, 0.0);
pub const PINK: Color = Color::opaque(1.0, 0.0, 1.0);
pub const WHITE: Color = Color::opaque(1.0, 1.0, 1.0);
pub const BLACK: Color = Color::opaque(0.0, 0.0, 0.0);
