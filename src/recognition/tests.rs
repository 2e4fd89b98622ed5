use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use super::*;
use crate::device::DeviceError;
use crate::draw::{BLACK, Bitmap, rasterize_strokes};
use crate::speech::SpeechError;

#[derive(Clone)]
struct MockRecognizer {
    words: Vec<(&'static str, f64)>,
    delay: Duration,
    error: Arc<Mutex<Option<RecognitionError>>>,
    seen_languages: Arc<Mutex<Vec<Vec<String>>>>,
    seen_png: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockRecognizer {
    fn returning(words: Vec<(&'static str, f64)>) -> Self {
        Self {
            words,
            delay: Duration::ZERO,
            error: Arc::new(Mutex::new(None)),
            seen_languages: Arc::new(Mutex::new(Vec::new())),
            seen_png: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, png: &[u8], languages: &[String]) -> Result<OcrText, RecognitionError> {
        self.seen_languages.lock().unwrap().push(languages.to_vec());
        self.seen_png.lock().unwrap().push(png.to_vec());
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(OcrText::from_words(
            self.words
                .iter()
                .map(|(text, confidence)| WordConfidence {
                    text: text.to_string(),
                    confidence: *confidence,
                })
                .collect(),
        ))
    }
}

#[derive(Clone, Default)]
struct MockSpeech {
    should_fail: bool,
    spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SpeechSink for MockSpeech {
    async fn speak(&self, text: &str) -> Result<String, SpeechError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.should_fail {
            Err(SpeechError::AllEnginesFailed(vec!["espeak: gone".to_string()]))
        } else {
            Ok("mock-voice".to_string())
        }
    }
}

#[derive(Clone, Default)]
struct MockDevice {
    fail_with_io: bool,
    disconnected: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DeviceSink for MockDevice {
    async fn forward(&self, text: &str) -> Result<(), DeviceError> {
        if self.disconnected {
            return Err(DeviceError::NotConnected);
        }
        if self.fail_with_io {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "unplugged",
            )));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn raster() -> Arc<Bitmap> {
    Arc::new(rasterize_strokes(&[], 64, 48, BLACK).unwrap())
}

fn settings() -> RecognitionSettings {
    RecognitionSettings {
        languages: vec!["es".to_string(), "en".to_string()],
        confidence_floor: 0.5,
        timeout: Duration::from_secs(5),
        export_directory: None,
        export_template: "dibujo_%Y%m%d_%H%M%S".to_string(),
        transcript_path: None,
        speak: true,
        forward_to_device: true,
    }
}

fn dispatcher(
    settings: RecognitionSettings,
    recognizer: MockRecognizer,
    speech: MockSpeech,
    device: MockDevice,
) -> RecognitionDispatcher {
    RecognitionDispatcher::with_dependencies(
        &tokio::runtime::Handle::current(),
        settings,
        RecognitionDependencies {
            recognizer: Arc::new(recognizer),
            speech: Arc::new(speech),
            device: Arc::new(device),
        },
    )
}

#[tokio::test]
async fn dispatcher_starts_idle() {
    let dispatcher = dispatcher(
        settings(),
        MockRecognizer::returning(Vec::new()),
        MockSpeech::default(),
        MockDevice::default(),
    );
    assert_eq!(dispatcher.status().await, RecognitionStatus::Idle);
    assert_eq!(dispatcher.try_status(), Some(RecognitionStatus::Idle));
}

#[tokio::test]
async fn recognized_text_is_spoken_and_forwarded() {
    let recognizer = MockRecognizer::returning(vec![("HOLA", 0.9), ("MUNDO", 0.8)]);
    let speech = MockSpeech::default();
    let device = MockDevice::default();
    let mut dispatcher = dispatcher(settings(), recognizer.clone(), speech.clone(), device.clone());

    dispatcher.request(7, raster()).unwrap();
    let outcome = dispatcher.next_outcome().await.unwrap();

    match outcome {
        RecognitionOutcome::Delivered {
            result,
            speech: speech_status,
            device: device_status,
        } => {
            assert_eq!(result.text, "HOLA MUNDO");
            assert!((result.confidence - 0.85).abs() < 1e-9);
            assert!(!result.low_confidence);
            assert_eq!(result.revision, 7);
            assert_eq!(result.words.len(), 2);
            assert_eq!(speech_status, DeliveryStatus::Done("mock-voice".to_string()));
            assert_eq!(device_status, DeliveryStatus::Done("HOLA MUNDO".to_string()));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(speech.spoken.lock().unwrap().as_slice(), ["HOLA MUNDO"]);
    assert_eq!(device.sent.lock().unwrap().as_slice(), ["HOLA MUNDO"]);
    assert_eq!(
        recognizer.seen_languages.lock().unwrap()[0],
        vec!["es".to_string(), "en".to_string()]
    );
    // PNG signature
    assert_eq!(
        &recognizer.seen_png.lock().unwrap()[0][0..8],
        &[137, 80, 78, 71, 13, 10, 26, 10]
    );
    assert_eq!(dispatcher.status().await, RecognitionStatus::Done);
}

#[tokio::test]
async fn low_confidence_text_is_flagged_and_still_delivered() {
    let recognizer = MockRecognizer::returning(vec![("HOLA", 0.2)]);
    let speech = MockSpeech::default();
    let device = MockDevice::default();
    let mut dispatcher = dispatcher(settings(), recognizer, speech.clone(), device.clone());

    dispatcher.request(1, raster()).unwrap();
    match dispatcher.next_outcome().await.unwrap() {
        RecognitionOutcome::Delivered { result, .. } => {
            assert_eq!(result.text, "HOLA");
            assert!(result.low_confidence);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(speech.spoken.lock().unwrap().len(), 1);
    assert_eq!(device.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_recognition_reports_no_text() {
    let speech = MockSpeech::default();
    let mut dispatcher = dispatcher(
        settings(),
        MockRecognizer::returning(vec![("  ", 0.9)]),
        speech.clone(),
        MockDevice::default(),
    );

    dispatcher.request(3, raster()).unwrap();
    assert_eq!(
        dispatcher.next_outcome().await,
        Some(RecognitionOutcome::NoText { revision: 3 })
    );
    assert!(speech.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn recognizer_error_becomes_failed_outcome() {
    let recognizer = MockRecognizer::returning(vec![("X", 1.0)]);
    *recognizer.error.lock().unwrap() = Some(RecognitionError::Unavailable("tesseract".into()));
    let mut dispatcher = dispatcher(
        settings(),
        recognizer,
        MockSpeech::default(),
        MockDevice::default(),
    );

    dispatcher.request(4, raster()).unwrap();
    match dispatcher.next_outcome().await.unwrap() {
        RecognitionOutcome::Failed { revision, reason } => {
            assert_eq!(revision, 4);
            assert!(reason.contains("tesseract"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(matches!(
        dispatcher.status().await,
        RecognitionStatus::Failed(_)
    ));
}

#[tokio::test]
async fn slow_recognizer_times_out() {
    let mut recognizer = MockRecognizer::returning(vec![("X", 1.0)]);
    recognizer.delay = Duration::from_secs(10);
    let mut settings = settings();
    settings.timeout = Duration::from_millis(50);
    let mut dispatcher = dispatcher(
        settings,
        recognizer,
        MockSpeech::default(),
        MockDevice::default(),
    );

    dispatcher.request(5, raster()).unwrap();
    match dispatcher.next_outcome().await.unwrap() {
        RecognitionOutcome::Failed { reason, .. } => assert!(reason.contains("timed out")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn speech_failure_does_not_block_device() {
    let speech = MockSpeech {
        should_fail: true,
        ..Default::default()
    };
    let device = MockDevice::default();
    let mut dispatcher = dispatcher(
        settings(),
        MockRecognizer::returning(vec![("HOLA", 0.9)]),
        speech,
        device.clone(),
    );

    dispatcher.request(1, raster()).unwrap();
    match dispatcher.next_outcome().await.unwrap() {
        RecognitionOutcome::Delivered {
            speech: speech_status,
            device: device_status,
            ..
        } => {
            assert!(matches!(speech_status, DeliveryStatus::Failed(_)));
            assert_eq!(device_status, DeliveryStatus::Done("HOLA".to_string()));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(device.sent.lock().unwrap().as_slice(), ["HOLA"]);
}

#[tokio::test]
async fn device_failure_does_not_block_speech() {
    let speech = MockSpeech::default();
    let device = MockDevice {
        fail_with_io: true,
        ..Default::default()
    };
    let mut dispatcher = dispatcher(
        settings(),
        MockRecognizer::returning(vec![("HOLA", 0.9)]),
        speech.clone(),
        device,
    );

    dispatcher.request(1, raster()).unwrap();
    match dispatcher.next_outcome().await.unwrap() {
        RecognitionOutcome::Delivered {
            speech: speech_status,
            device: device_status,
            ..
        } => {
            assert_eq!(speech_status, DeliveryStatus::Done("mock-voice".to_string()));
            assert!(matches!(device_status, DeliveryStatus::Failed(_)));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(speech.spoken.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_channels_and_missing_device_are_skipped() {
    let mut settings = settings();
    settings.speak = false;
    let speech = MockSpeech::default();
    let device = MockDevice {
        disconnected: true,
        ..Default::default()
    };
    let mut dispatcher = dispatcher(
        settings,
        MockRecognizer::returning(vec![("HOLA", 0.9)]),
        speech.clone(),
        device,
    );

    dispatcher.request(1, raster()).unwrap();
    match dispatcher.next_outcome().await.unwrap() {
        RecognitionOutcome::Delivered {
            speech: speech_status,
            device: device_status,
            ..
        } => {
            assert_eq!(speech_status, DeliveryStatus::Skipped);
            assert_eq!(device_status, DeliveryStatus::Skipped);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(speech.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn export_and_transcript_are_written() {
    let temp = tempfile::tempdir().unwrap();
    let mut settings = settings();
    settings.export_directory = Some(temp.path().join("exports"));
    settings.export_template = "dibujo_test".to_string();
    settings.transcript_path = Some(temp.path().join("texto_reconocido.txt"));

    let mut dispatcher = dispatcher(
        settings,
        MockRecognizer::returning(vec![("HOLA", 0.9)]),
        MockSpeech::default(),
        MockDevice::default(),
    );

    dispatcher.request(2, raster()).unwrap();
    let Some(RecognitionOutcome::Delivered { result, .. }) = dispatcher.next_outcome().await
    else {
        panic!("expected delivery");
    };

    let exported = result.exported_path.unwrap();
    assert!(exported.ends_with("exports/dibujo_test.png"));
    let bytes = std::fs::read(&exported).unwrap();
    assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(
        std::fs::read_to_string(temp.path().join("texto_reconocido.txt")).unwrap(),
        "Texto reconocido: HOLA\n"
    );
}

#[tokio::test]
async fn shutdown_waits_for_queued_requests() {
    let mut recognizer = MockRecognizer::returning(vec![("HOLA", 0.9)]);
    recognizer.delay = Duration::from_millis(50);
    let speech = MockSpeech::default();
    let dispatcher = dispatcher(
        settings(),
        recognizer,
        speech.clone(),
        MockDevice::default(),
    );

    dispatcher.request(1, raster()).unwrap();
    dispatcher.request(2, raster()).unwrap();
    dispatcher.shutdown().await;
    assert_eq!(speech.spoken.lock().unwrap().len(), 2);
}
