//! Landmark sources feeding the frame loop.
//!
//! Camera backends are external; they hand frames to airscriber through a
//! [`LandmarkSource`]. The bundled [`JsonLinesSource`] reads one JSON frame per
//! line, so any tracker that can print landmarks can drive the pipeline
//! through a pipe or a recorded file.

use super::landmarks::LandmarkFrame;
use std::collections::VecDeque;
use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read landmark stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed landmark frame on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Produces one [`LandmarkFrame`] per camera tick.
///
/// Sources are read on their own thread so a stalled tracker cannot block the
/// frame loop.
pub trait LandmarkSource: Send {
    /// Returns the next frame, or `None` once the stream has ended.
    ///
    /// A parse error only affects the current frame; callers may keep reading.
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError>;
}

/// Reads newline-delimited JSON frames, e.g.
/// `{"timestamp_ms": 33, "landmarks": [{"x": 0.5, "y": 0.4, "z": 0.0}, ...]}`.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    buffer: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead + Send> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let trimmed = self.buffer.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|source| SourceError::Parse {
                    line: self.line,
                    source,
                });
        }
    }
}

/// In-memory frames, replayed in order.
#[derive(Debug, Default)]
pub struct FrameListSource {
    frames: VecDeque<LandmarkFrame>,
}

impl FrameListSource {
    pub fn new(frames: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl LandmarkSource for FrameListSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}
