//! Handwriting recognition and delivery.
//!
//! The dispatcher takes rasterized canvases from the frame loop, recognizes
//! them off-thread and hands the text to speech and to the robotic hand:
//! - OCR through a [`TextRecognizer`] (tesseract by default)
//! - Optional PNG export and transcript file
//! - Concurrent, independent speech and device delivery

mod dependencies;
mod dispatcher;
mod export;
mod tesseract;
pub mod types;
#[cfg(test)]
mod tests;

pub use dependencies::{DeviceSink, NoDevice, RecognitionDependencies, SpeechSink, TextRecognizer};
pub use dispatcher::{RecognitionDispatcher, RecognitionSettings};
pub use export::{append_transcript, export_png};
pub use tesseract::{TesseractRecognizer, language_arg, parse_tsv, tesseract_language};
pub use types::{
    DeliveryStatus, OcrText, RecognitionError, RecognitionOutcome, RecognitionResult,
    RecognitionStatus, WordConfidence,
};
