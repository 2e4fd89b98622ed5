use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{self, JoinHandle};

use super::dependencies::RecognitionDependencies;
use super::export;
use super::types::{
    DeliveryStatus, RecognitionError, RecognitionOutcome, RecognitionResult, RecognitionStatus,
};
use crate::config::RecognitionConfig;
use crate::device::DeviceError;
use crate::draw::Bitmap;
use crate::util::expand_tilde;

/// Tunables for one dispatcher.
#[derive(Debug, Clone)]
pub struct RecognitionSettings {
    pub languages: Vec<String>,
    pub confidence_floor: f64,
    pub timeout: Duration,
    pub export_directory: Option<PathBuf>,
    pub export_template: String,
    pub transcript_path: Option<PathBuf>,
    pub speak: bool,
    pub forward_to_device: bool,
}

impl RecognitionSettings {
    pub fn from_config(config: &RecognitionConfig, speak: bool, forward_to_device: bool) -> Self {
        Self {
            languages: config.languages.clone(),
            confidence_floor: config.confidence_floor,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            export_directory: config.export_directory.as_deref().map(expand_tilde),
            export_template: config.export_template.clone(),
            transcript_path: config.transcript_path.as_deref().map(expand_tilde),
            speak,
            forward_to_device,
        }
    }
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self::from_config(&RecognitionConfig::default(), true, true)
    }
}

#[derive(Debug)]
struct RecognitionRequest {
    revision: u64,
    bitmap: Arc<Bitmap>,
}

/// Runs recognition off the frame loop.
///
/// The frame loop submits rasters; a background task recognizes them one at a
/// time and reports outcomes through a channel the loop polls.
pub struct RecognitionDispatcher {
    request_tx: mpsc::UnboundedSender<RecognitionRequest>,
    outcome_rx: mpsc::UnboundedReceiver<RecognitionOutcome>,
    status: Arc<Mutex<RecognitionStatus>>,
    worker: JoinHandle<()>,
}

impl RecognitionDispatcher {
    pub fn new(runtime_handle: &tokio::runtime::Handle, settings: RecognitionSettings) -> Self {
        Self::with_dependencies(runtime_handle, settings, RecognitionDependencies::default())
    }

    /// Create a dispatcher with custom collaborators (useful for testing).
    pub fn with_dependencies(
        runtime_handle: &tokio::runtime::Handle,
        settings: RecognitionSettings,
        dependencies: RecognitionDependencies,
    ) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<RecognitionRequest>();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(RecognitionStatus::Idle));

        let status_clone = status.clone();
        let settings = Arc::new(settings);
        let worker = runtime_handle.spawn(async move {
            while let Some(request) = request_rx.recv().await {
                log::debug!("Processing recognition request for revision {}", request.revision);
                *status_clone.lock().await = RecognitionStatus::Recognizing;

                let revision = request.revision;
                let outcome = match perform_recognition(request, &settings, &dependencies).await {
                    Ok(outcome) => {
                        *status_clone.lock().await = RecognitionStatus::Done;
                        outcome
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        log::error!("Recognition failed: {}", reason);
                        *status_clone.lock().await = RecognitionStatus::Failed(reason.clone());
                        RecognitionOutcome::Failed { revision, reason }
                    }
                };

                if outcome_tx.send(outcome).is_err() {
                    log::debug!("Recognition outcome dropped; receiver gone");
                }
            }
        });

        Self {
            request_tx,
            outcome_rx,
            status,
            worker,
        }
    }

    /// Queue a raster for recognition. Returns immediately.
    pub fn request(&self, revision: u64, bitmap: Arc<Bitmap>) -> Result<(), RecognitionError> {
        self.request_tx
            .send(RecognitionRequest { revision, bitmap })
            .map_err(|_| RecognitionError::NotRunning)
    }

    /// Next finished outcome, without waiting.
    pub fn try_next_outcome(&mut self) -> Option<RecognitionOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    pub async fn next_outcome(&mut self) -> Option<RecognitionOutcome> {
        self.outcome_rx.recv().await
    }

    pub fn try_status(&self) -> Option<RecognitionStatus> {
        self.status.try_lock().ok().map(|s| s.clone())
    }

    pub async fn status(&self) -> RecognitionStatus {
        self.status.lock().await.clone()
    }

    /// Stop accepting requests and wait for queued ones to finish.
    pub async fn shutdown(self) {
        drop(self.request_tx);
        if let Err(e) = self.worker.await {
            log::error!("Recognition task ended abnormally: {}", e);
        }
    }
}

async fn perform_recognition(
    request: RecognitionRequest,
    settings: &RecognitionSettings,
    dependencies: &RecognitionDependencies,
) -> Result<RecognitionOutcome, RecognitionError> {
    let RecognitionRequest { revision, bitmap } = request;
    log::info!(
        "Recognizing {}x{} raster (revision {})",
        bitmap.width,
        bitmap.height,
        revision
    );

    let png = task::spawn_blocking(move || bitmap.to_png())
        .await
        .map_err(|e| RecognitionError::Task(e.to_string()))??;

    let exported_path = match &settings.export_directory {
        Some(directory) => {
            let directory = directory.clone();
            let template = settings.export_template.clone();
            let bytes = png.clone();
            match task::spawn_blocking(move || export::export_png(&bytes, &directory, &template))
                .await
            {
                Ok(Ok(path)) => Some(path),
                Ok(Err(e)) => {
                    log::warn!("Failed to export drawing: {}", e);
                    None
                }
                Err(e) => {
                    log::warn!("Export task failed: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let ocr = tokio::time::timeout(
        settings.timeout,
        dependencies.recognizer.recognize(&png, &settings.languages),
    )
    .await
    .map_err(|_| RecognitionError::Timeout(settings.timeout))??;

    let text = ocr.text();
    if text.trim().is_empty() {
        log::warn!("No text recognized in revision {}", revision);
        return Ok(RecognitionOutcome::NoText { revision });
    }

    let confidence = ocr.confidence();
    let low_confidence = confidence < settings.confidence_floor;
    if low_confidence {
        log::warn!(
            "Low-confidence recognition ({:.2} < {:.2}): {}",
            confidence,
            settings.confidence_floor,
            text
        );
    } else {
        log::info!("Recognized text ({:.2}): {}", confidence, text);
    }

    if let Some(path) = settings.transcript_path.clone() {
        let line = text.clone();
        match task::spawn_blocking(move || export::append_transcript(&path, &line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Failed to append transcript: {}", e),
            Err(e) => log::warn!("Transcript task failed: {}", e),
        }
    }

    let speech = async {
        if !settings.speak {
            return DeliveryStatus::Skipped;
        }
        match dependencies.speech.speak(&text).await {
            Ok(engine) => DeliveryStatus::Done(engine),
            Err(e) => {
                log::error!("Speech delivery failed: {}", e);
                DeliveryStatus::Failed(e.to_string())
            }
        }
    };
    let device = async {
        if !settings.forward_to_device {
            return DeliveryStatus::Skipped;
        }
        match dependencies.device.forward(&text).await {
            Ok(()) => DeliveryStatus::Done(text.clone()),
            Err(DeviceError::NotConnected) => {
                log::info!("Robotic hand not connected; text not forwarded");
                DeliveryStatus::Skipped
            }
            Err(e) => {
                log::error!("Device delivery failed: {}", e);
                DeliveryStatus::Failed(e.to_string())
            }
        }
    };
    let (speech, device) = futures::join!(speech, device);

    Ok(RecognitionOutcome::Delivered {
        result: RecognitionResult {
            text,
            confidence,
            words: ocr.words,
            low_confidence,
            revision,
            exported_path,
        },
        speech,
        device,
    })
}
