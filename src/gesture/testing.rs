//! Synthetic hands for unit tests.

use super::landmarks::*;

pub const FIST: [bool; 5] = [false; 5];
pub const OPEN_HAND: [bool; 5] = [true; 5];
pub const INDEX_ONLY: [bool; 5] = [false, true, false, false, false];

const DIRECTIONS: [(f64, f64); 5] = [
    (-0.8, -0.6),
    (-0.3, -0.95),
    (0.0, -1.0),
    (0.3, -0.95),
    (0.55, -0.83),
];

/// Builds a complete hand whose index fingertip lands on `index_tip` (normalized coordinates).
///
/// `extended` lists thumb, index, middle, ring and pinky.
pub fn hand(timestamp_ms: u64, extended: [bool; 5], index_tip: (f64, f64)) -> LandmarkFrame {
    let mut points = vec![(0.0, 0.0); HAND_LANDMARK_COUNT];
    for (finger, &(dx, dy)) in DIRECTIONS.iter().enumerate() {
        let joints: [f64; 4] = if finger == 0 {
            let tip = if extended[0] { 0.17 } else { 0.09 };
            [0.04, 0.08, 0.12, tip]
        } else if extended[finger] {
            [0.10, 0.16, 0.20, 0.24]
        } else {
            [0.10, 0.16, 0.14, 0.12]
        };
        for (j, scale) in joints.iter().enumerate() {
            points[1 + finger * 4 + j] = (dx * scale, dy * scale);
        }
    }

    let (tip_x, tip_y) = points[INDEX_TIP];
    let (off_x, off_y) = (index_tip.0 - tip_x, index_tip.1 - tip_y);
    let landmarks = points
        .into_iter()
        .map(|(x, y)| Landmark::new(x + off_x, y + off_y, 0.0))
        .collect();

    LandmarkFrame::new(timestamp_ms, landmarks)
}
