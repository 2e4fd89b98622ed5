//! Configuration type definitions.

use super::enums::{ColorSpec, SessionCompression, SessionStorageMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Drawing-related settings.
///
/// Controls the pen, the eraser and the canvas the strokes are replayed onto.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DrawingConfig {
    /// Pen color - either a named color (red, green, blue, yellow, orange, pink, white, black)
    /// or an RGB array like `[0, 255, 0]` for green
    #[serde(default = "default_color")]
    pub color: ColorSpec,

    /// Pen thickness in pixels (valid range: 1.0 - 50.0)
    #[serde(default = "default_thickness")]
    pub thickness: f64,

    /// Eraser radius in pixels around the fingertip (valid range: 1.0 - 200.0)
    #[serde(default = "default_eraser_radius")]
    pub eraser_radius: f64,

    /// Canvas width in pixels
    #[serde(default = "default_width")]
    pub width: i32,

    /// Canvas height in pixels
    #[serde(default = "default_height")]
    pub height: i32,

    /// Canvas background color
    #[serde(default = "default_background")]
    pub background: ColorSpec,

    /// Maximum number of undo steps kept in memory
    #[serde(default = "default_max_undo")]
    pub max_undo: usize,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            thickness: default_thickness(),
            eraser_radius: default_eraser_radius(),
            width: default_width(),
            height: default_height(),
            background: default_background(),
            max_undo: default_max_undo(),
        }
    }
}

/// Gesture classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GestureConfig {
    /// A finger counts as extended when its tip is this many times farther from the
    /// wrist than its middle joint (valid range: 0.5 - 3.0)
    #[serde(default = "default_extension_ratio")]
    pub extension_ratio: f64,

    /// Thumb-index tip distance, relative to palm size, below which a pinch is detected
    #[serde(default = "default_pinch_threshold")]
    pub pinch_threshold: f64,

    /// How long a gesture must persist before it is confirmed, in milliseconds
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,

    /// Number of recent frames used for the majority vote
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Events below this confidence are treated as Unknown
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Mirror the fingertip horizontally (selfie cameras)
    #[serde(default)]
    pub mirror: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            extension_ratio: default_extension_ratio(),
            pinch_threshold: default_pinch_threshold(),
            dwell_ms: default_dwell_ms(),
            smoothing_window: default_smoothing_window(),
            min_confidence: default_min_confidence(),
            mirror: false,
        }
    }
}

/// Action bound to an on-screen button.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonAction {
    /// Enter drawing mode
    Draw,
    /// Enter erasing mode
    Erase,
    /// Rasterize and recognize the canvas
    Save,
    /// Clear the canvas
    Clear,
    /// Shut down
    Exit,
}

/// One on-screen button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ButtonConfig {
    pub action: ButtonAction,
    pub label: String,
    /// Top-left corner in canvas pixels
    pub x: i32,
    pub y: i32,
}

/// UI layout and preview styling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UiConfig {
    /// Buttons selectable with a closed fist
    #[serde(default = "default_buttons")]
    pub buttons: Vec<ButtonConfig>,

    /// Button width in pixels
    #[serde(default = "default_button_width")]
    pub button_width: i32,

    /// Button height in pixels
    #[serde(default = "default_button_height")]
    pub button_height: i32,

    /// How long a confirmed fist must stay on a button before it fires, in milliseconds
    #[serde(default = "default_button_dwell_ms")]
    pub button_dwell_ms: u64,

    /// Button fill color
    #[serde(default = "default_button_color")]
    pub button_color: ColorSpec,

    /// Fill color for the active/selected button
    #[serde(default = "default_selected_color")]
    pub selected_color: ColorSpec,

    /// Label and status text color
    #[serde(default = "default_text_color")]
    pub text_color: ColorSpec,

    /// Font family for labels and the status line
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Draw the status line (mode, gesture, last message) in previews
    #[serde(default = "default_show_status")]
    pub show_status_bar: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            buttons: default_buttons(),
            button_width: default_button_width(),
            button_height: default_button_height(),
            button_dwell_ms: default_button_dwell_ms(),
            button_color: default_button_color(),
            selected_color: default_selected_color(),
            text_color: default_text_color(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            show_status_bar: default_show_status(),
        }
    }
}

/// Autosave and crash recovery.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Enable autosave
    #[serde(default = "default_session_enabled")]
    pub enabled: bool,

    /// Storage location: auto (data dir), config (next to config file) or custom
    #[serde(default = "default_storage_mode")]
    pub storage: SessionStorageMode,

    /// Directory used when `storage = "custom"` (supports `~/`)
    #[serde(default)]
    pub custom_directory: Option<String>,

    /// Seconds between autosaves
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,

    /// Number of session files kept; older ones are deleted
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Compression: auto, on or off
    #[serde(default = "default_session_compression")]
    pub compress: SessionCompression,

    /// Payload size above which `auto` compression kicks in, in KiB
    #[serde(default = "default_auto_compress_threshold_kb")]
    pub auto_compress_threshold_kb: u64,

    /// Session files larger than this are refused, in MiB
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Maximum strokes written per session
    #[serde(default = "default_max_strokes")]
    pub max_strokes: usize,

    /// Restore the newest session automatically after an unclean shutdown
    #[serde(default = "default_auto_recover")]
    pub auto_recover: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: default_session_enabled(),
            storage: default_storage_mode(),
            custom_directory: None,
            autosave_interval_secs: default_autosave_interval(),
            history_limit: default_history_limit(),
            compress: default_session_compression(),
            auto_compress_threshold_kb: default_auto_compress_threshold_kb(),
            max_file_size_mb: default_max_file_size_mb(),
            max_strokes: default_max_strokes(),
            auto_recover: default_auto_recover(),
        }
    }
}

/// Handwriting recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecognitionConfig {
    /// Enable recognition on the save button
    #[serde(default = "default_recognition_enabled")]
    pub enabled: bool,

    /// ISO 639-1 language codes passed to the recognizer
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Results below this confidence (0.0 - 1.0) are flagged as low confidence
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Recognition attempts taking longer than this are treated as failed
    #[serde(default = "default_recognition_timeout")]
    pub timeout_secs: u64,

    /// Tesseract executable
    #[serde(default = "default_tesseract_program")]
    pub program: String,

    /// Directory where each recognized raster is saved as PNG (disabled when unset)
    #[serde(default)]
    pub export_directory: Option<String>,

    /// chrono format string for exported raster filenames
    #[serde(default = "default_export_template")]
    pub export_template: String,

    /// File each recognized text is appended to (disabled when unset)
    #[serde(default)]
    pub transcript_path: Option<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            enabled: default_recognition_enabled(),
            languages: default_languages(),
            confidence_floor: default_confidence_floor(),
            timeout_secs: default_recognition_timeout(),
            program: default_tesseract_program(),
            export_directory: None,
            export_template: default_export_template(),
            transcript_path: None,
        }
    }
}

/// One text-to-speech command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpeechEngineConfig {
    /// Name used in logs
    pub name: String,
    /// Executable looked up on PATH
    pub program: String,
    /// Arguments; `{text}`, `{lang}`, `{voice}` and `{rate}` are substituted
    #[serde(default)]
    pub args: Vec<String>,
    /// Engine requires network access
    #[serde(default)]
    pub network: bool,
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpeechConfig {
    /// Speak recognized text
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,

    /// Engines tried in order until one succeeds
    #[serde(default = "default_speech_engines")]
    pub engines: Vec<SpeechEngineConfig>,

    /// Sentence spoken for a result; `{text}` is the recognized text
    #[serde(default = "default_announce_template")]
    pub announce_template: String,

    /// Language code substituted for `{lang}`
    #[serde(default = "default_speech_language")]
    pub language: String,

    /// Voice substituted for `{voice}` (defaults to the language)
    #[serde(default)]
    pub voice: Option<String>,

    /// Speaking rate in words per minute, substituted for `{rate}`
    #[serde(default = "default_speech_rate")]
    pub rate: u32,

    /// Per-utterance timeout in seconds
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
            engines: default_speech_engines(),
            announce_template: default_announce_template(),
            language: default_speech_language(),
            voice: None,
            rate: default_speech_rate(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

/// Robotic hand serial link.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeviceConfig {
    /// Enable the device bridge
    #[serde(default = "default_device_enabled")]
    pub enabled: bool,

    /// Fixed serial port; skips identifier matching when set
    #[serde(default)]
    pub port: Option<String>,

    /// Case-insensitive substrings matched against port names and driver names
    #[serde(default = "default_identifiers")]
    pub identifiers: Vec<String>,

    /// Serial speed
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Time allowed for the handshake reply, in milliseconds
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Delay after opening a port before talking to it (boards reset on open)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Line sent during the handshake (no probe when unset)
    #[serde(default)]
    pub probe: Option<String>,

    /// Substring the handshake reply must contain (any reply when unset)
    #[serde(default)]
    pub expect: Option<String>,

    /// Pause between consecutive commands, in milliseconds
    #[serde(default = "default_inter_command_delay_ms")]
    pub inter_command_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enabled: default_device_enabled(),
            port: None,
            identifiers: default_identifiers(),
            baud_rate: default_baud_rate(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            settle_ms: default_settle_ms(),
            probe: None,
            expect: None,
            inter_command_delay_ms: default_inter_command_delay_ms(),
        }
    }
}

/// Frame loop and shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeConfig {
    /// Maximum frames processed per second (0 = as fast as the source delivers)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    /// Time background work may take to finish after shutdown is requested
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Write the preview image every N frames
    #[serde(default = "default_preview_every")]
    pub preview_every_n_frames: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            shutdown_grace_secs: default_shutdown_grace(),
            preview_every_n_frames: default_preview_every(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_color() -> ColorSpec {
    ColorSpec::Rgb([0, 255, 0])
}

fn default_thickness() -> f64 {
    3.0
}

fn default_eraser_radius() -> f64 {
    30.0
}

fn default_width() -> i32 {
    640
}

fn default_height() -> i32 {
    480
}

fn default_background() -> ColorSpec {
    ColorSpec::Name("black".to_string())
}

fn default_max_undo() -> usize {
    100
}

fn default_extension_ratio() -> f64 {
    1.1
}

fn default_pinch_threshold() -> f64 {
    0.25
}

fn default_dwell_ms() -> u64 {
    500
}

fn default_smoothing_window() -> usize {
    5
}

fn default_min_confidence() -> f64 {
    0.3
}

pub(crate) fn default_buttons() -> Vec<ButtonConfig> {
    [
        (ButtonAction::Draw, "Dibujar"),
        (ButtonAction::Erase, "Borrar"),
        (ButtonAction::Save, "Guardar"),
        (ButtonAction::Clear, "Limpiar"),
        (ButtonAction::Exit, "Salir"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (action, label))| ButtonConfig {
        action,
        label: label.to_string(),
        x: 10 + i as i32 * 120,
        y: 10,
    })
    .collect()
}

fn default_button_width() -> i32 {
    100
}

fn default_button_height() -> i32 {
    40
}

fn default_button_dwell_ms() -> u64 {
    300
}

fn default_button_color() -> ColorSpec {
    ColorSpec::Rgb([200, 200, 200])
}

fn default_selected_color() -> ColorSpec {
    ColorSpec::Rgb([0, 255, 255])
}

fn default_text_color() -> ColorSpec {
    ColorSpec::Name("white".to_string())
}

fn default_font_family() -> String {
    "Sans".to_string()
}

fn default_font_size() -> f64 {
    14.0
}

fn default_show_status() -> bool {
    true
}

fn default_session_enabled() -> bool {
    true
}

fn default_storage_mode() -> SessionStorageMode {
    SessionStorageMode::Auto
}

fn default_autosave_interval() -> u64 {
    60
}

fn default_history_limit() -> usize {
    5
}

fn default_session_compression() -> SessionCompression {
    SessionCompression::Auto
}

fn default_auto_compress_threshold_kb() -> u64 {
    100
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_max_strokes() -> usize {
    10_000
}

fn default_auto_recover() -> bool {
    true
}

fn default_recognition_enabled() -> bool {
    true
}

fn default_languages() -> Vec<String> {
    vec!["es".to_string(), "en".to_string()]
}

fn default_confidence_floor() -> f64 {
    0.5
}

fn default_recognition_timeout() -> u64 {
    30
}

fn default_tesseract_program() -> String {
    "tesseract".to_string()
}

fn default_export_template() -> String {
    "dibujo_%Y%m%d_%H%M%S.png".to_string()
}

fn default_speech_enabled() -> bool {
    true
}

fn default_speech_engines() -> Vec<SpeechEngineConfig> {
    let espeak_args = || {
        ["-v", "{voice}", "-s", "{rate}", "{text}"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
    };
    vec![
        SpeechEngineConfig {
            name: "speech-dispatcher".to_string(),
            program: "spd-say".to_string(),
            args: ["--wait", "--language", "{lang}", "{text}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            network: false,
        },
        SpeechEngineConfig {
            name: "espeak-ng".to_string(),
            program: "espeak-ng".to_string(),
            args: espeak_args(),
            network: false,
        },
        SpeechEngineConfig {
            name: "espeak".to_string(),
            program: "espeak".to_string(),
            args: espeak_args(),
            network: false,
        },
    ]
}

fn default_announce_template() -> String {
    "Texto reconocido: {text}".to_string()
}

fn default_speech_language() -> String {
    "es".to_string()
}

fn default_speech_rate() -> u32 {
    160
}

fn default_speech_timeout() -> u64 {
    20
}

fn default_device_enabled() -> bool {
    true
}

fn default_identifiers() -> Vec<String> {
    [
        "arduino",
        "ch340",
        "ch341",
        "cp210",
        "ftdi",
        "usb serial",
        "usb2.0-serial",
        "cdc_acm",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_handshake_timeout_ms() -> u64 {
    2000
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_inter_command_delay_ms() -> u64 {
    500
}

fn default_frame_rate() -> f64 {
    30.0
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_preview_every() -> u32 {
    15
}
