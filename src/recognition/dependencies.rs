use std::sync::Arc;

use async_trait::async_trait;

use super::tesseract::TesseractRecognizer;
use super::types::{OcrText, RecognitionError};
use crate::config::SpeechConfig;
use crate::device::{DeviceBridge, DeviceError};
use crate::speech::{SpeechChain, SpeechError};

/// Turns a PNG raster into words.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, png: &[u8], languages: &[String]) -> Result<OcrText, RecognitionError>;
}

/// Speaks recognized text. Returns the engine that spoke.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<String, SpeechError>;
}

/// Forwards recognized text to the robotic hand.
#[async_trait]
pub trait DeviceSink: Send + Sync {
    async fn forward(&self, text: &str) -> Result<(), DeviceError>;
}

/// Bundle of collaborators used by the dispatcher. Each component can be mocked in tests.
#[derive(Clone)]
pub struct RecognitionDependencies {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub speech: Arc<dyn SpeechSink>,
    pub device: Arc<dyn DeviceSink>,
}

impl Default for RecognitionDependencies {
    fn default() -> Self {
        Self {
            recognizer: Arc::new(TesseractRecognizer::default()),
            speech: Arc::new(SpeechChain::from_config(&SpeechConfig::default())),
            device: Arc::new(NoDevice),
        }
    }
}

/// Stand-in when the device bridge is disabled.
pub struct NoDevice;

#[async_trait]
impl DeviceSink for NoDevice {
    async fn forward(&self, _text: &str) -> Result<(), DeviceError> {
        Err(DeviceError::NotConnected)
    }
}

#[async_trait]
impl SpeechSink for SpeechChain {
    async fn speak(&self, text: &str) -> Result<String, SpeechError> {
        let chain = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || chain.announce(&text))
            .await
            .map_err(|e| SpeechError::AllEnginesFailed(vec![format!("speech task failed: {}", e)]))?
    }
}

#[async_trait]
impl DeviceSink for DeviceBridge {
    async fn forward(&self, text: &str) -> Result<(), DeviceError> {
        self.send_async(text).await
    }
}
