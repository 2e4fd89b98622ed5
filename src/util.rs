//! Utility functions for colors, geometry, and path handling.
//!
//! This module provides:
//! - Name-to-color mapping for the configuration file
//! - Axis-aligned rectangles used for button hit-boxes
//! - Small geometry helpers shared by the classifier and the canvas

use crate::draw::{Color, color::*};
use std::path::PathBuf;

// ============================================================================
// Color Mapping
// ============================================================================

/// Maps color name strings to Color values.
///
/// Used by the configuration system to parse color names from the config file.
/// Spanish names are accepted as well since the default button labels are Spanish.
///
/// # Supported Names (case-insensitive)
/// - "red"/"rojo", "green"/"verde", "blue"/"azul", "yellow"/"amarillo",
///   "orange"/"naranja", "pink"/"rosa", "white"/"blanco", "black"/"negro"
pub fn name_to_color(name: &str) -> Option<Color> {
    match name.to_lowercase().as_str() {
        "red" | "rojo" => Some(RED),
        "green" | "verde" => Some(GREEN),
        "blue" | "azul" => Some(BLUE),
        "yellow" | "amarillo" => Some(YELLOW),
        "orange" | "naranja" => Some(ORANGE),
        "pink" | "rosa" => Some(PINK),
        "white" | "blanco" => Some(WHITE),
        "black" | "negro" => Some(BLACK),
        _ => None,
    }
}

/// Maps a Color value to its human-readable name.
///
/// Uses approximate matching (threshold-based) to identify colors.
/// Used when logging a fallback for an unknown configured color.
pub fn color_to_name(color: &Color) -> &'static str {
    if color.r > 0.9 && color.g < 0.1 && color.b < 0.1 {
        "Red"
    } else if color.r < 0.1 && color.g > 0.9 && color.b < 0.1 {
        "Green"
    } else if color.r < 0.1 && color.g < 0.1 && color.b > 0.9 {
        "Blue"
    } else if color.r > 0.9 && color.g > 0.9 && color.b < 0.1 {
        "Yellow"
    } else if color.r > 0.9 && (0.4..=0.6).contains(&color.g) && color.b < 0.1 {
        "Orange"
    } else if color.r > 0.9 && color.g < 0.1 && color.b > 0.9 {
        "Pink"
    } else if color.r > 0.9 && color.g > 0.9 && color.b > 0.9 {
        "White"
    } else if color.r < 0.1 && color.g < 0.1 && color.b < 0.1 {
        "Black"
    } else {
        "Custom"
    }
}

// ============================================================================
// Geometry Utilities
// ============================================================================

/// Axis-aligned rectangle used for UI button hit-boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Creates a new rectangle. Width/height must be positive.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Option<Self> {
        if width <= 0 || height <= 0 {
            None
        } else {
            Some(Self {
                x,
                y,
                width,
                height,
            })
        }
    }

    /// Returns true when the point lies inside the rectangle (min inclusive, max exclusive).
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Euclidean distance between two points in pixel space.
pub fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

/// Expands a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{BLACK, RED, WHITE};

    #[test]
    fn name_color_mappings_accept_both_languages() {
        assert_eq!(name_to_color("white").unwrap(), WHITE);
        assert_eq!(name_to_color("Rojo").unwrap(), RED);
        assert_eq!(name_to_color("negro").unwrap(), BLACK);
        assert!(name_to_color("chartreuse").is_none());
    }

    #[test]
    fn color_to_name_matches_known_colors() {
        assert_eq!(color_to_name(&RED), "Red");
        assert_eq!(color_to_name(&BLACK), "Black");
        assert_eq!(
            color_to_name(&Color {
                r: 0.42,
                g: 0.42,
                b: 0.42,
                a: 1.0
            }),
            "Custom"
        );
    }

    #[test]
    fn rect_contains_uses_half_open_bounds() {
        let rect = Rect::new(50, 50, 100, 40).unwrap();
        assert!(rect.contains(50, 50));
        assert!(rect.contains(149, 89));
        assert!(!rect.contains(150, 60));
        assert!(!rect.contains(60, 90));
        assert!(Rect::new(0, 0, 0, 10).is_none());
    }
}
