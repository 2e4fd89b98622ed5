//! Cairo-based rendering of strokes and raster bitmaps.

use super::color::Color;
use super::stroke::{Point, Stroke};
use cairo::{Format, ImageSurface};
use std::path::Path;
use thiserror::Error;

/// Failures while rasterizing or encoding the canvas.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("surface data unavailable: {0}")]
    SurfaceData(String),

    #[error("PNG encoding failed: {0}")]
    Png(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An owned ARGB32 raster of the canvas.
///
/// Pixels are stored the way cairo lays out `Format::ARgb32`: native-endian
/// premultiplied 32-bit words, `stride` bytes per row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    pub data: Vec<u8>,
}

impl Bitmap {
    /// Returns the pixel at `(x, y)` as `(r, g, b, a)` bytes, or `None` when out of bounds.
    pub fn pixel(&self, x: i32, y: i32) -> Option<(u8, u8, u8, u8)> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.stride + x * 4) as usize;
        let word = u32::from_ne_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]);
        Some((
            ((word >> 16) & 0xff) as u8,
            ((word >> 8) & 0xff) as u8,
            (word & 0xff) as u8,
            (word >> 24) as u8,
        ))
    }

    /// Encodes the bitmap as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let surface = ImageSurface::create_for_data(
            self.data.clone(),
            Format::ARgb32,
            self.width,
            self.height,
            self.stride,
        )?;
        let mut buffer = Vec::new();
        surface
            .write_to_png(&mut buffer)
            .map_err(|e| RenderError::Png(e.to_string()))?;
        Ok(buffer)
    }

    /// Copies the pixels out of a finished image surface.
    ///
    /// Every context drawing on the surface must have been dropped.
    pub fn from_surface(surface: &mut ImageSurface) -> Result<Self, RenderError> {
        surface.flush();
        let (width, height, stride) = (surface.width(), surface.height(), surface.stride());
        let data = surface
            .data()
            .map_err(|e| RenderError::SurfaceData(e.to_string()))?
            .to_vec();
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Writes the bitmap to `path` as a PNG file.
    pub fn write_png(&self, path: &Path) -> Result<(), RenderError> {
        let bytes = self.to_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Paints the whole surface with the background color.
pub fn render_background(ctx: &cairo::Context, background: Color) {
    ctx.save().ok();
    ctx.set_operator(cairo::Operator::Source);
    background.apply(ctx);
    let _ = ctx.paint();
    ctx.restore().ok();
}

/// Renders all strokes in order (first stroke = bottom layer).
pub fn render_strokes(ctx: &cairo::Context, strokes: &[Stroke]) {
    for stroke in strokes {
        render_stroke(ctx, &stroke.points, stroke.color, stroke.thickness);
    }
}

/// Renders a polyline through the points with round caps and joins.
///
/// A single point is drawn as a dot of the stroke's thickness.
pub fn render_stroke(ctx: &cairo::Context, points: &[Point], color: Color, thickness: f64) {
    let Some(first) = points.first() else {
        return;
    };

    color.apply(ctx);
    ctx.set_line_width(thickness);
    ctx.set_line_cap(cairo::LineCap::Round);
    ctx.set_line_join(cairo::LineJoin::Round);

    ctx.move_to(first.x as f64, first.y as f64);
    if points.len() == 1 {
        // Zero-length segment so the round cap produces a dot
        ctx.line_to(first.x as f64, first.y as f64);
    }
    for p in &points[1..] {
        ctx.line_to(p.x as f64, p.y as f64);
    }

    let _ = ctx.stroke();
}

/// Replays the strokes onto a fresh `width × height` surface.
///
/// The output depends only on the arguments, so two calls with the same
/// stroke sequence produce identical bitmaps.
pub fn rasterize_strokes(
    strokes: &[Stroke],
    width: i32,
    height: i32,
    background: Color,
) -> Result<Bitmap, RenderError> {
    let mut surface = ImageSurface::create(Format::ARgb32, width, height)?;
    {
        let ctx = cairo::Context::new(&surface)?;
        render_background(&ctx, background);
        render_strokes(&ctx, strokes);
    }
    Bitmap::from_surface(&mut surface)
}
