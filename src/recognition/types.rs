//! Data types for handwriting recognition.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::draw::RenderError;

/// One recognized word and the recognizer's certainty in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WordConfidence {
    pub text: String,
    pub confidence: f64,
}

/// Raw output of a text recognizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrText {
    pub words: Vec<WordConfidence>,
}

impl OcrText {
    pub fn from_words(words: Vec<WordConfidence>) -> Self {
        Self { words }
    }

    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Mean word confidence, 0 when nothing was recognized.
    pub fn confidence(&self) -> f64 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|w| w.confidence).sum::<f64>() / self.words.len() as f64
    }
}

/// Recognized text handed to speech and the device.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f64,
    pub words: Vec<WordConfidence>,
    /// Confidence fell below the configured floor; the text is still delivered.
    pub low_confidence: bool,
    /// Canvas revision the raster was taken from.
    pub revision: u64,
    /// Where the raster was exported, if export is enabled.
    pub exported_path: Option<PathBuf>,
}

/// What happened to one delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Done(String),
    Skipped,
    Failed(String),
}

/// Outcome of a recognition request (delivered, empty or failed).
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Delivered {
        result: RecognitionResult,
        speech: DeliveryStatus,
        device: DeliveryStatus,
    },
    NoText {
        revision: u64,
    },
    Failed {
        revision: u64,
        reason: String,
    },
}

/// Status of the recognition worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionStatus {
    Idle,
    Recognizing,
    Done,
    Failed(String),
}

/// Errors that can occur while recognizing a raster.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("text recognizer {0} is not available")]
    Unavailable(String),

    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),

    #[error("{program} failed with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to encode raster: {0}")]
    Render(#[from] RenderError),

    #[error("recognizer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recognition task failed: {0}")]
    Task(String),

    #[error("recognition dispatcher not running")]
    NotRunning,
}
