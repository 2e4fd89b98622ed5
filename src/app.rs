//! Frame loop and shutdown.
//!
//! One thread pulls landmark frames, classifies them, runs the mode state
//! machine against the canvas and renders the preview. Autosave, recognition
//! and speech run on a tokio runtime and the serial link on its own worker
//! thread; their results come back through channels polled once per frame.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};

use crate::config::Config;
use crate::device::{DeviceBridge, DeviceSettings};
use crate::draw::CanvasState;
use crate::draw::color::BLACK;
use crate::gesture::{
    ClassifierSettings, GestureClassifier, JsonLinesSource, LandmarkFrame, LandmarkSource,
    SourceError,
};
use crate::input::{Action, ButtonLayout, DEFAULT_MESSAGE_MS, InputSettings, InputState};
use crate::recognition::{
    DeviceSink, NoDevice, RecognitionDependencies, RecognitionDispatcher, RecognitionOutcome,
    RecognitionSettings, TesseractRecognizer, TextRecognizer,
};
use crate::session::{self, RunMarker, SessionManager};
use crate::speech::SpeechChain;
use crate::ui::{PreviewStyle, render_preview};

/// Shut down background work after this long when abandoning it.
const RUNTIME_DROP_TIMEOUT: Duration = Duration::from_millis(200);

/// How long a recognized text stays in the status line.
const RESULT_MESSAGE_MS: u64 = 5000;

/// Frames the reader thread may buffer ahead of the frame loop.
const READ_AHEAD_FRAMES: usize = 4;

/// How often the frame loop checks the shutdown flag while waiting for a frame.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command-line choices that affect a run.
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Directory the configuration was loaded from; session storage may live next to it
    pub config_dir: PathBuf,
    /// Skip crash recovery even when the previous run ended uncleanly
    pub no_recover: bool,
    /// Where to write the composite preview PNG
    pub preview: Option<PathBuf>,
}

/// Why the frame loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The landmark source ran out of frames
    SourceEnded,
    /// The Salir button fired
    ExitButton,
    /// SIGINT or SIGTERM
    Signal,
}

/// What happened during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub strokes: usize,
    pub revision: u64,
    pub recognitions_requested: usize,
    pub outcomes: usize,
    pub recovered: bool,
    pub exit_reason: ExitReason,
}

/// Opens a JSON-lines landmark stream; `-` reads stdin.
pub fn open_source(path: &Path) -> Result<Box<dyn LandmarkSource>> {
    if path.as_os_str() == "-" {
        log::info!("Reading landmark frames from stdin");
        return Ok(Box::new(JsonLinesSource::new(BufReader::new(io::stdin()))));
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open landmark source {}", path.display()))?;
    log::info!("Replaying landmark frames from {}", path.display());
    Ok(Box::new(JsonLinesSource::new(BufReader::new(file))))
}

/// Builds the canvas described by the `[drawing]` section.
pub fn canvas_from_config(config: &Config) -> CanvasState {
    CanvasState::new(
        config.drawing.width,
        config.drawing.height,
        config.drawing.background.to_color_or(BLACK),
        config.drawing.max_undo,
    )
}

/// Runs the frame loop until the source ends, Salir fires or a signal arrives.
pub fn run(config: &Config, source: Box<dyn LandmarkSource>, options: AppOptions) -> Result<RunSummary> {
    let recognizer = Arc::new(TesseractRecognizer::new(config.recognition.program.clone()));
    run_with_recognizer(config, source, options, recognizer)
}

/// [`run`] with a custom text recognizer.
pub fn run_with_recognizer(
    config: &Config,
    source: Box<dyn LandmarkSource>,
    options: AppOptions,
    recognizer: Arc<dyn TextRecognizer>,
) -> Result<RunSummary> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("airscriber-worker")
        .build()
        .context("Failed to start async runtime")?;

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, shutdown_flag.clone())
            .with_context(|| format!("Failed to register handler for signal {}", signal))?;
    }

    let mut canvas = canvas_from_config(config);
    let layout = ButtonLayout::from_config(&config.ui, canvas.width(), canvas.height());
    let mut state = InputState::new(InputSettings::from_config(config), layout);
    let mut classifier =
        GestureClassifier::new(ClassifierSettings::from_config(&config.gesture, &config.drawing));

    let (mut session, recovered) = start_session(
        config,
        &options,
        runtime.handle(),
        &mut canvas,
        &mut state,
    );

    let bridge = if config.device.enabled {
        match DeviceBridge::start(DeviceSettings::from_config(&config.device)) {
            Ok(bridge) => Some(bridge),
            Err(e) => {
                log::warn!("Failed to start device bridge: {}; continuing without hardware", e);
                None
            }
        }
    } else {
        log::info!("Device bridge disabled in config");
        None
    };

    let mut dispatcher = if config.recognition.enabled {
        let device: Arc<dyn DeviceSink> = match &bridge {
            Some(bridge) => Arc::new(bridge.clone()),
            None => Arc::new(NoDevice),
        };
        let dependencies = RecognitionDependencies {
            recognizer,
            speech: Arc::new(SpeechChain::from_config(&config.speech)),
            device,
        };
        let settings = RecognitionSettings::from_config(
            &config.recognition,
            config.speech.enabled,
            bridge.is_some(),
        );
        Some(RecognitionDispatcher::with_dependencies(
            runtime.handle(),
            settings,
            dependencies,
        ))
    } else {
        log::info!("Recognition disabled in config");
        None
    };

    let style = PreviewStyle::from_config(&config.ui);
    let preview_every = u64::from(config.runtime.preview_every_n_frames.max(1));
    let frame_interval = (config.runtime.frame_rate > 0.0)
        .then(|| Duration::from_secs_f64(1.0 / config.runtime.frame_rate));

    let frames_rx = spawn_reader(source)?;
    let mut frames = 0u64;
    let mut last_timestamp = 0u64;
    let mut recognitions_requested = 0usize;
    let mut outcomes = 0usize;

    let exit_reason = loop {
        if shutdown_flag.load(Ordering::Relaxed) {
            log::info!("Shutdown signal received");
            break ExitReason::Signal;
        }

        let frame = match frames_rx.recv_timeout(SIGNAL_POLL_INTERVAL) {
            Ok(Ok(frame)) => frame,
            Ok(Err(SourceError::Io(e))) => {
                log::error!("Landmark source failed: {}", e);
                break ExitReason::SourceEnded;
            }
            Ok(Err(e)) => {
                log::warn!("Skipping frame: {}", e);
                continue;
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("Landmark source ended after {} frames", frames);
                break ExitReason::SourceEnded;
            }
        };
        let frame_started = Instant::now();
        frames += 1;
        last_timestamp = frame.timestamp_ms;

        let event = classifier.classify(&frame);
        for action in state.handle_gesture(&event, &mut canvas) {
            match action {
                Action::Recognize => {
                    if submit_recognition(&mut canvas, &mut state, session.as_mut(), dispatcher.as_ref()) {
                        recognitions_requested += 1;
                    }
                }
                Action::Exit => log::info!("Exit requested from the Salir button"),
            }
        }

        if let Some(session) = session.as_mut() {
            session.publish(&canvas);
        }

        if let Some(dispatcher) = dispatcher.as_mut() {
            while let Some(outcome) = dispatcher.try_next_outcome() {
                outcomes += 1;
                let duration = match outcome {
                    RecognitionOutcome::Delivered { .. } => RESULT_MESSAGE_MS,
                    _ => DEFAULT_MESSAGE_MS,
                };
                state.set_message_for(outcome_message(&outcome), duration);
            }
        }

        if let Some(path) = &options.preview
            && frames % preview_every == 0
            && state.needs_redraw
        {
            write_preview(path, &canvas, &state, &style, last_timestamp);
            state.needs_redraw = false;
        }

        if state.should_exit {
            break ExitReason::ExitButton;
        }

        if let Some(interval) = frame_interval {
            let elapsed = frame_started.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    };

    // A stroke still being traced when the loop ends is kept
    if canvas.seal_stroke()
        && let Some(session) = session.as_mut()
    {
        session.publish(&canvas);
    }

    if let Some(path) = &options.preview {
        write_preview(path, &canvas, &state, &style, last_timestamp);
    }

    // Recognition and the final session save run side by side under the grace period
    let grace = Duration::from_secs(config.runtime.shutdown_grace_secs);
    let deadline = Instant::now() + grace;
    log::info!("Waiting up to {:?} for background work", grace);
    let (recognition_finished, session_result) = runtime.block_on(async move {
        let recognition = async move {
            match dispatcher {
                Some(dispatcher) => tokio::time::timeout(grace, dispatcher.shutdown())
                    .await
                    .is_ok(),
                None => true,
            }
        };
        let persistence = async move {
            match session {
                Some(session) => session.shutdown(grace).await,
                None => Ok(()),
            }
        };
        futures::join!(recognition, persistence)
    });
    if !recognition_finished {
        log::warn!("Recognition did not finish within {:?}; abandoning it", grace);
    }
    if let Err(e) = session_result {
        log::warn!("Session shutdown failed: {:#}", e);
    }

    if let Some(bridge) = bridge {
        bridge.shutdown_timeout(deadline.saturating_duration_since(Instant::now()));
    }
    runtime.shutdown_timeout(RUNTIME_DROP_TIMEOUT);

    let summary = RunSummary {
        frames,
        strokes: canvas.strokes().len(),
        revision: canvas.revision(),
        recognitions_requested,
        outcomes,
        recovered,
        exit_reason,
    };
    log::info!("Run finished: {:?}", summary);
    Ok(summary)
}

/// Reads the landmark source on its own thread.
///
/// The channel closes when the source ends or fails. A read blocked on a
/// silent pipe is left behind at shutdown.
fn spawn_reader(
    mut source: Box<dyn LandmarkSource>,
) -> Result<Receiver<Result<LandmarkFrame, SourceError>>> {
    let (tx, rx) = mpsc::sync_channel(READ_AHEAD_FRAMES);
    thread::Builder::new()
        .name("landmark-reader".to_string())
        .spawn(move || {
            loop {
                let (item, last) = match source.next_frame() {
                    Ok(Some(frame)) => (Ok(frame), false),
                    Ok(None) => break,
                    Err(e @ SourceError::Io(_)) => (Err(e), true),
                    Err(e) => (Err(e), false),
                };
                if tx.send(item).is_err() || last {
                    break;
                }
            }
        })
        .context("Failed to start landmark reader thread")?;
    Ok(rx)
}

/// Acquires the run marker, restores a crashed session if allowed and spawns autosave.
///
/// Session persistence problems never stop the application; they are logged
/// and the run continues without autosave.
fn start_session(
    config: &Config,
    options: &AppOptions,
    runtime_handle: &tokio::runtime::Handle,
    canvas: &mut CanvasState,
    state: &mut InputState,
) -> (Option<SessionManager>, bool) {
    let session_options = match session::options_from_config(&config.session, &options.config_dir) {
        Ok(opts) => opts,
        Err(e) => {
            log::warn!("Session persistence unavailable: {:#}", e);
            return (None, false);
        }
    };
    if !session_options.enabled {
        log::info!("Session persistence disabled in config");
        return (None, false);
    }

    let marker = match RunMarker::acquire(&session_options) {
        Ok(marker) => marker,
        Err(e) => {
            log::warn!("Failed to create run marker: {:#}", e);
            return (None, false);
        }
    };

    let mut recovered = false;
    if options.no_recover || !session_options.auto_recover {
        if marker.previous_run_unclean() {
            log::info!("Previous run ended uncleanly; recovery skipped");
        }
    } else {
        match session::recovery_candidate(&session_options, &marker) {
            Ok(Some(loaded)) => {
                canvas.restore(&loaded.file.canvas);
                state.set_message(format!(
                    "Sesión recuperada ({} trazos)",
                    loaded.file.canvas.strokes.len()
                ));
                recovered = true;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Session recovery failed: {:#}", e),
        }
    }

    let manager = SessionManager::start(runtime_handle, session_options, Some(marker), canvas);
    (Some(manager), recovered)
}

/// Saves the session, then rasterizes the canvas and queues it for recognition.
fn submit_recognition(
    canvas: &mut CanvasState,
    state: &mut InputState,
    session: Option<&mut SessionManager>,
    dispatcher: Option<&RecognitionDispatcher>,
) -> bool {
    if let Some(session) = session {
        session.publish(canvas);
        if let Err(e) = session.request_save() {
            log::warn!("Explicit save failed: {:#}", e);
        }
    }

    let Some(dispatcher) = dispatcher else {
        state.set_message("Reconocimiento desactivado");
        return false;
    };

    let bitmap = match canvas.rasterize() {
        Ok(bitmap) => bitmap,
        Err(e) => {
            log::error!("Failed to rasterize canvas: {}", e);
            state.set_message("No se pudo rasterizar el lienzo");
            return false;
        }
    };

    match dispatcher.request(canvas.revision(), bitmap) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to queue recognition: {}", e);
            state.set_message("Reconocimiento no disponible");
            false
        }
    }
}

/// Status line text for a finished recognition.
pub fn outcome_message(outcome: &RecognitionOutcome) -> String {
    match outcome {
        RecognitionOutcome::Delivered { result, .. } if result.low_confidence => {
            format!("Texto: {} (confianza baja {:.0}%)", result.text, result.confidence * 100.0)
        }
        RecognitionOutcome::Delivered { result, .. } => format!("Texto: {}", result.text),
        RecognitionOutcome::NoText { .. } => "No se reconoció texto".to_string(),
        RecognitionOutcome::Failed { reason, .. } => format!("Error de reconocimiento: {}", reason),
    }
}

fn write_preview(
    path: &Path,
    canvas: &CanvasState,
    state: &InputState,
    style: &PreviewStyle,
    now_ms: u64,
) {
    match render_preview(canvas, state, style, now_ms).and_then(|bitmap| bitmap.write_png(path)) {
        Ok(()) => log::debug!("Preview written to {}", path.display()),
        Err(e) => log::warn!("Failed to write preview {}: {}", path.display(), e),
    }
}
