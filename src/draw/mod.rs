//! Drawing primitives and the stroke canvas (Cairo-based).
//!
//! This module defines the core drawing types used for air drawing:
//! - [`Color`]: RGBA color representation with predefined color constants
//! - [`Stroke`]: A contiguous trace made with the index finger
//! - [`CanvasState`]: The undoable stroke log and its cached raster
//! - Rendering functions for Cairo-based output

pub mod canvas;
pub mod color;
pub mod render;
pub mod stroke;

// Re-export commonly used types at module level
pub use canvas::{CanvasDelta, CanvasError, CanvasSnapshot, CanvasState, EraseChange};
pub use render::{Bitmap, RenderError, rasterize_strokes, render_background, render_strokes};
pub use stroke::{Point, Stroke};
pub use color::{BLACK, BLUE, Color, GREEN, ORANGE, PINK, RED, WHITE, YELLOW};
