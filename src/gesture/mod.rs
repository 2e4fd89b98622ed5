//! Hand landmarks, landmark sources and gesture classification.

pub mod classifier;
pub mod landmarks;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{ClassifierSettings, GestureClassifier, GestureEvent, GestureLabel};
pub use landmarks::{HAND_LANDMARK_COUNT, Landmark, LandmarkFrame};
pub use source::{FrameListSource, JsonLinesSource, LandmarkSource, SourceError};
