//! Undoable stroke log with a cached raster.

use super::color::Color;
use super::render::{self, Bitmap, RenderError};
use super::stroke::{Point, Stroke};
use crate::input::Mode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("cannot {operation} while in {mode:?} mode")]
    InvalidState { operation: &'static str, mode: Mode },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One replaced stroke inside an erase delta.
#[derive(Clone, Debug, PartialEq)]
pub struct EraseChange {
    /// Position of `original` in the stroke list before the erase.
    pub index: usize,
    pub original: Stroke,
    /// Surviving runs that took its place (possibly none).
    pub pieces: Vec<Stroke>,
}

/// A reversible canvas mutation stored on the undo/redo stacks.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasDelta {
    Add { index: usize, stroke: Stroke },
    /// Changes are sorted by ascending `index`.
    Erase { changes: Vec<EraseChange> },
    Clear { strokes: Vec<Stroke> },
}

impl CanvasDelta {
    fn apply(&self, strokes: &mut Vec<Stroke>) {
        match self {
            CanvasDelta::Add { index, stroke } => {
                let index = (*index).min(strokes.len());
                strokes.insert(index, stroke.clone());
            }
            CanvasDelta::Erase { changes } => {
                for change in changes.iter().rev() {
                    if change.index < strokes.len() {
                        strokes.splice(change.index..change.index + 1, change.pieces.iter().cloned());
                    }
                }
            }
            CanvasDelta::Clear { .. } => strokes.clear(),
        }
    }

    fn revert(&self, strokes: &mut Vec<Stroke>) {
        match self {
            CanvasDelta::Add { index, .. } => {
                if *index < strokes.len() {
                    strokes.remove(*index);
                }
            }
            CanvasDelta::Erase { changes } => {
                for change in changes {
                    let end = (change.index + change.pieces.len()).min(strokes.len());
                    let start = change.index.min(end);
                    strokes.splice(start..end, std::iter::once(change.original.clone()));
                }
            }
            CanvasDelta::Clear { strokes: saved } => *strokes = saved.clone(),
        }
    }
}

/// Immutable copy of the committed canvas handed to background tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    pub revision: u64,
    pub width: i32,
    pub height: i32,
    pub background: Color,
    pub strokes: Vec<Stroke>,
}

impl CanvasSnapshot {
    /// Replays the snapshot into a fresh bitmap.
    pub fn rasterize(&self) -> Result<Bitmap, RenderError> {
        render::rasterize_strokes(&self.strokes, self.width, self.height, self.background)
    }
}

/// The drawing canvas: committed strokes, the active stroke, and history.
///
/// Only the frame loop mutates the canvas. Every committed mutation bumps
/// `revision`, which also invalidates the raster cache.
#[derive(Debug)]
pub struct CanvasState {
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
    undo_stack: Vec<CanvasDelta>,
    redo_stack: Vec<CanvasDelta>,
    max_undo: usize,
    revision: u64,
    width: i32,
    height: i32,
    background: Color,
    raster: Option<(u64, Arc<Bitmap>)>,
}

impl CanvasState {
    pub fn new(width: i32, height: i32, background: Color, max_undo: usize) -> Self {
        Self {
            strokes: Vec::new(),
            active: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo: max_undo.max(1),
            revision: 0,
            width,
            height,
            background,
            raster: None,
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.active.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Starts a new stroke at `point`. Any stroke already in progress is sealed first.
    pub fn begin_stroke(
        &mut self,
        mode: Mode,
        point: Point,
        color: Color,
        thickness: f64,
    ) -> Result<(), CanvasError> {
        if mode != Mode::Drawing {
            return Err(CanvasError::InvalidState {
                operation: "begin a stroke",
                mode,
            });
        }
        self.seal_stroke();
        self.active = Some(Stroke::new(point, color, thickness));
        Ok(())
    }

    /// Appends a point to the active stroke. Returns false when no stroke is active.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        let Some(stroke) = self.active.as_mut() else {
            return false;
        };
        if stroke.points.last() != Some(&point) {
            stroke.points.push(point);
        }
        true
    }

    /// Commits the active stroke. Returns false when no stroke was active.
    pub fn seal_stroke(&mut self) -> bool {
        let Some(stroke) = self.active.take() else {
            return false;
        };
        let index = self.strokes.len();
        self.strokes.push(stroke.clone());
        log::debug!("Sealed stroke #{} with {} points", index, stroke.points.len());
        self.record(CanvasDelta::Add { index, stroke });
        true
    }

    /// Removes the parts of committed strokes within `radius` of `point`.
    ///
    /// Strokes crossing the eraser are split into the runs that survive.
    /// Returns false (and records nothing) when no stroke was in range.
    pub fn erase_at(&mut self, point: Point, radius: f64) -> bool {
        let changes: Vec<EraseChange> = self
            .strokes
            .iter()
            .enumerate()
            .filter_map(|(index, stroke)| {
                stroke
                    .split_outside(point, radius)
                    .map(|pieces| EraseChange {
                        index,
                        original: stroke.clone(),
                        pieces,
                    })
            })
            .collect();

        if changes.is_empty() {
            return false;
        }

        let delta = CanvasDelta::Erase { changes };
        delta.apply(&mut self.strokes);
        self.record(delta);
        true
    }

    /// Removes every committed stroke as one undoable step.
    pub fn clear(&mut self) -> bool {
        self.active = None;
        if self.strokes.is_empty() {
            return false;
        }
        let strokes = std::mem::take(&mut self.strokes);
        log::info!("Cleared canvas ({} strokes)", strokes.len());
        self.record(CanvasDelta::Clear { strokes });
        true
    }

    /// Reverts the latest delta. An active stroke is sealed first so it is what gets undone.
    pub fn undo(&mut self) -> bool {
        self.seal_stroke();
        let Some(delta) = self.undo_stack.pop() else {
            return false;
        };
        delta.revert(&mut self.strokes);
        self.redo_stack.push(delta);
        self.touch();
        true
    }

    /// Re-applies the most recently undone delta.
    pub fn redo(&mut self) -> bool {
        let Some(delta) = self.redo_stack.pop() else {
            return false;
        };
        delta.apply(&mut self.strokes);
        self.undo_stack.push(delta);
        self.touch();
        true
    }

    /// Returns the raster of the committed strokes, reusing the cache when unchanged.
    pub fn rasterize(&mut self) -> Result<Arc<Bitmap>, CanvasError> {
        if let Some((revision, bitmap)) = &self.raster
            && *revision == self.revision
        {
            return Ok(Arc::clone(bitmap));
        }
        let bitmap = Arc::new(render::rasterize_strokes(
            &self.strokes,
            self.width,
            self.height,
            self.background,
        )?);
        self.raster = Some((self.revision, Arc::clone(&bitmap)));
        Ok(bitmap)
    }

    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            revision: self.revision,
            width: self.width,
            height: self.height,
            background: self.background,
            strokes: self.strokes.clone(),
        }
    }

    /// Replaces the committed strokes with a recovered snapshot and resets history.
    pub fn restore(&mut self, snapshot: &CanvasSnapshot) {
        if snapshot.width != self.width || snapshot.height != self.height {
            log::warn!(
                "Restoring {}x{} snapshot onto {}x{} canvas; strokes keep their pixel positions",
                snapshot.width,
                snapshot.height,
                self.width,
                self.height
            );
        }
        self.strokes = snapshot.strokes.clone();
        self.active = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.revision = self.revision.max(snapshot.revision);
        self.touch();
    }

    fn record(&mut self, delta: CanvasDelta) {
        self.undo_stack.push(delta);
        if self.undo_stack.len() > self.max_undo {
            let overflow = self.undo_stack.len() - self.max_undo;
            self.undo_stack.drain(..overflow);
        }
        self.redo_stack.clear();
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
