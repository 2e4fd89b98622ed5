//! Landmark-distance gesture classifier with temporal smoothing.

use super::landmarks::*;
use crate::config::{DrawingConfig, GestureConfig};
use crate::draw::Point;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Ratio distance from the threshold at which a finger decision counts as fully certain.
const DECISION_MARGIN: f64 = 0.25;

/// A pause in the stream longer than this discards the smoothing history.
pub const STREAM_GAP_MS: u64 = 1000;

/// Discrete hand gestures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureLabel {
    /// Only the index finger extended (thumb ignored)
    IndexOnly,
    /// All five fingers flexed
    Fist,
    /// All five fingers extended
    OpenHand,
    /// Thumb and index tips touching with another finger extended
    Pinch,
    /// No pattern (or several) matched, or tracking was lost
    Unknown,
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureLabel::IndexOnly => "index",
            GestureLabel::Fist => "fist",
            GestureLabel::OpenHand => "open hand",
            GestureLabel::Pinch => "pinch",
            GestureLabel::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classification result for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureEvent {
    /// Instantaneous label for this frame
    pub label: GestureLabel,
    /// Debounced label, present once the smoothed label has persisted for the dwell time
    pub confirmed: Option<GestureLabel>,
    /// Mean decisiveness of the per-finger decisions (0.0 - 1.0)
    pub confidence: f64,
    pub timestamp_ms: u64,
    /// Index fingertip in canvas pixels
    pub fingertip: Option<Point>,
}

/// Tunables for [`GestureClassifier`].
#[derive(Clone, Debug)]
pub struct ClassifierSettings {
    pub extension_ratio: f64,
    pub pinch_threshold: f64,
    pub dwell_ms: u64,
    pub smoothing_window: usize,
    pub mirror: bool,
    pub canvas_width: i32,
    pub canvas_height: i32,
}

impl ClassifierSettings {
    pub fn from_config(gesture: &GestureConfig, drawing: &DrawingConfig) -> Self {
        Self {
            extension_ratio: gesture.extension_ratio,
            pinch_threshold: gesture.pinch_threshold,
            dwell_ms: gesture.dwell_ms,
            smoothing_window: gesture.smoothing_window.max(1),
            mirror: gesture.mirror,
            canvas_width: drawing.width,
            canvas_height: drawing.height,
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from_config(&GestureConfig::default(), &DrawingConfig::default())
    }
}

/// Per-finger joints used for the extended/flexed decision: (middle joint, tip).
const FINGERS: [(usize, usize); 5] = [
    (THUMB_IP, THUMB_TIP),
    (INDEX_PIP, INDEX_TIP),
    (MIDDLE_PIP, MIDDLE_TIP),
    (RING_PIP, RING_TIP),
    (PINKY_PIP, PINKY_TIP),
];

/// Maps landmark frames to gesture events.
///
/// The only state carried between frames is the smoothing window and the
/// dwell candidate, both private to the instance. Both are dropped when the
/// stream pauses for more than [`STREAM_GAP_MS`] or its timestamps restart.
#[derive(Debug)]
pub struct GestureClassifier {
    settings: ClassifierSettings,
    window: VecDeque<GestureLabel>,
    candidate: Option<(GestureLabel, u64)>,
    last_timestamp: Option<u64>,
}

impl GestureClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        let capacity = settings.smoothing_window.max(1);
        Self {
            settings,
            window: VecDeque::with_capacity(capacity),
            candidate: None,
            last_timestamp: None,
        }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Classifies one frame and updates the smoothing state.
    pub fn classify(&mut self, frame: &LandmarkFrame) -> GestureEvent {
        if let Some(last) = self.last_timestamp
            && (frame.timestamp_ms < last || frame.timestamp_ms - last > STREAM_GAP_MS)
        {
            log::debug!(
                "Landmark stream jumped from {} to {} ms; resetting smoothing",
                last,
                frame.timestamp_ms
            );
            self.reset();
        }
        self.last_timestamp = Some(frame.timestamp_ms);

        let (label, confidence) = self.instantaneous(frame);
        let fingertip = self.fingertip(frame);
        let confirmed = self.confirm(label, frame.timestamp_ms);

        GestureEvent {
            label,
            confirmed,
            confidence,
            timestamp_ms: frame.timestamp_ms,
            fingertip,
        }
    }

    /// Drops the smoothing history.
    pub fn reset(&mut self) {
        self.window.clear();
        self.candidate = None;
    }

    fn instantaneous(&self, frame: &LandmarkFrame) -> (GestureLabel, f64) {
        if !frame.is_complete() {
            return (GestureLabel::Unknown, 0.0);
        }
        let lm = &frame.landmarks;
        let wrist = &lm[WRIST];
        let palm = wrist.distance_to(&lm[MIDDLE_MCP]);
        if palm <= f64::EPSILON {
            return (GestureLabel::Unknown, 0.0);
        }

        let ratio = self.settings.extension_ratio;
        let mut extended = [false; 5];
        let mut certainty = [0.0; 5];
        for (i, (mid, tip)) in FINGERS.iter().enumerate() {
            let mid_dist = wrist.distance_to(&lm[*mid]);
            if mid_dist <= f64::EPSILON {
                return (GestureLabel::Unknown, 0.0);
            }
            let r = wrist.distance_to(&lm[*tip]) / mid_dist;
            extended[i] = r > ratio;
            certainty[i] = ((r - ratio).abs() / DECISION_MARGIN).min(1.0);
        }

        let [_thumb, index, middle, ring, pinky] = extended;
        let pinch_dist = lm[THUMB_TIP].distance_to(&lm[INDEX_TIP]) / palm;
        let pinch_threshold = self.settings.pinch_threshold;

        let mut matches = Vec::with_capacity(1);
        if index && !middle && !ring && !pinky {
            matches.push(GestureLabel::IndexOnly);
        }
        if extended.iter().all(|e| !e) {
            matches.push(GestureLabel::Fist);
        }
        if extended.iter().all(|e| *e) {
            matches.push(GestureLabel::OpenHand);
        }
        if pinch_dist < pinch_threshold && (middle || ring || pinky) {
            matches.push(GestureLabel::Pinch);
        }

        let label = match matches.as_slice() {
            [only] => *only,
            _ => GestureLabel::Unknown,
        };

        let confidence = match label {
            GestureLabel::IndexOnly => mean(&certainty[1..]),
            GestureLabel::Pinch => {
                let pinch_certainty =
                    ((pinch_threshold - pinch_dist) / pinch_threshold).clamp(0.0, 1.0);
                (mean(&certainty[2..]) + pinch_certainty) / 2.0
            }
            _ => mean(&certainty),
        };

        (label, confidence)
    }

    fn fingertip(&self, frame: &LandmarkFrame) -> Option<Point> {
        if !frame.is_complete() {
            return None;
        }
        let tip = frame.landmarks[INDEX_TIP];
        let x = if self.settings.mirror { 1.0 - tip.x } else { tip.x };
        Some(Point::new(
            (x * self.settings.canvas_width as f64).round() as i32,
            (tip.y * self.settings.canvas_height as f64).round() as i32,
        ))
    }

    fn confirm(&mut self, label: GestureLabel, timestamp_ms: u64) -> Option<GestureLabel> {
        if self.window.len() == self.settings.smoothing_window {
            self.window.pop_front();
        }
        self.window.push_back(label);
        let smoothed = self.majority();

        match self.candidate {
            Some((current, since)) if current == smoothed && timestamp_ms >= since => {
                (timestamp_ms - since >= self.settings.dwell_ms).then_some(smoothed)
            }
            _ => {
                self.candidate = Some((smoothed, timestamp_ms));
                (self.settings.dwell_ms == 0).then_some(smoothed)
            }
        }
    }

    /// Most frequent label in the window; ties go to the most recent label.
    fn majority(&self) -> GestureLabel {
        let mut best = GestureLabel::Unknown;
        let mut best_count = 0;
        for label in self.window.iter().rev() {
            let count = self.window.iter().filter(|l| *l == label).count();
            if count > best_count {
                best = *label;
                best_count = count;
            }
        }
        best
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
