//! Stroke definitions for air drawing.

use super::color::Color;
use crate::util;
use serde::{Deserialize, Serialize};

/// A point on the canvas in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Distance to another point in pixels.
    pub fn distance_to(&self, other: Point) -> f64 {
        util::distance(self.x as f64, self.y as f64, other.x as f64, other.y as f64)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// One continuous trace drawn with the index finger.
///
/// All points share the same color and thickness. Strokes are owned by the
/// [`CanvasState`](super::CanvasState) and rendered in insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Sequence of points traced by the fingertip
    pub points: Vec<Point>,
    /// Stroke color
    pub color: Color,
    /// Line thickness in pixels
    pub thickness: f64,
}

impl Stroke {
    /// Creates a stroke that starts at `point`.
    pub fn new(point: Point, color: Color, thickness: f64) -> Self {
        Self {
            points: vec![point],
            color,
            thickness,
        }
    }

    /// Creates a stroke sharing this stroke's style with the given points.
    pub fn with_points(&self, points: Vec<Point>) -> Self {
        Self {
            points,
            color: self.color,
            thickness: self.thickness,
        }
    }

    /// Returns true when any point of the stroke lies within `radius` of `center`.
    pub fn touches(&self, center: Point, radius: f64) -> bool {
        self.points
            .iter()
            .any(|p| p.distance_to(center) <= radius)
    }

    /// Splits the stroke into the runs of points lying outside the eraser circle.
    ///
    /// Returns `None` when no point is inside the circle (stroke untouched).
    pub fn split_outside(&self, center: Point, radius: f64) -> Option<Vec<Stroke>> {
        if !self.touches(center, radius) {
            return None;
        }

        let mut pieces = Vec::new();
        let mut run: Vec<Point> = Vec::new();
        for &point in &self.points {
            if point.distance_to(center) <= radius {
                if !run.is_empty() {
                    pieces.push(self.with_points(std::mem::take(&mut run)));
                }
            } else {
                run.push(point);
            }
        }
        if !run.is_empty() {
            pieces.push(self.with_points(run));
        }
        Some(pieces)
    }
}
