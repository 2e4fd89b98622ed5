//! Configuration file support for airscriber.
//!
//! This module handles loading and validating user settings from the configuration file
//! located at `~/.config/airscriber/config.toml`. Settings include pen defaults,
//! gesture tuning, the button layout, autosave, recognition, speech and the
//! robotic hand serial link.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

// Re-export commonly used types at module level
pub use enums::{ColorSpec, SessionCompression, SessionStorageMode};
pub use types::{
    ButtonAction, ButtonConfig, DeviceConfig, DrawingConfig, GestureConfig, RecognitionConfig,
    RuntimeConfig, SessionConfig, SpeechConfig, SpeechEngineConfig, UiConfig,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Baud rates the serial transport can configure.
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19_200, 38_400, 57_600, 115_200, 230_400,
];

/// Main configuration structure containing all user settings.
///
/// All fields have sensible defaults and will use those if not specified in the config file.
///
/// # Example TOML
/// ```toml
/// [drawing]
/// color = "green"
/// thickness = 3.0
/// eraser_radius = 30.0
///
/// [gesture]
/// dwell_ms = 500
///
/// [recognition]
/// languages = ["es", "en"]
///
/// [device]
/// baud_rate = 9600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Pen, eraser and canvas settings
    #[serde(default)]
    pub drawing: DrawingConfig,

    /// Gesture classifier tuning
    #[serde(default)]
    pub gesture: GestureConfig,

    /// Button layout and preview styling
    #[serde(default)]
    pub ui: UiConfig,

    /// Autosave and crash recovery
    #[serde(default)]
    pub session: SessionConfig,

    /// Handwriting recognition
    #[serde(default)]
    pub recognition: RecognitionConfig,

    /// Text-to-speech
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Robotic hand serial link
    #[serde(default)]
    pub device: DeviceConfig,

    /// Frame loop and shutdown
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value (or reset to the
    /// default) and a warning is logged.
    fn validate_and_clamp(&mut self) {
        clamp_f64("drawing.thickness", &mut self.drawing.thickness, 1.0, 50.0);
        clamp_f64(
            "drawing.eraser_radius",
            &mut self.drawing.eraser_radius,
            1.0,
            200.0,
        );

        if !(64..=4096).contains(&self.drawing.width) {
            warn!(
                "Invalid drawing.width {}, clamping to 64-4096 range",
                self.drawing.width
            );
            self.drawing.width = self.drawing.width.clamp(64, 4096);
        }
        if !(64..=4096).contains(&self.drawing.height) {
            warn!(
                "Invalid drawing.height {}, clamping to 64-4096 range",
                self.drawing.height
            );
            self.drawing.height = self.drawing.height.clamp(64, 4096);
        }
        if self.drawing.max_undo == 0 {
            warn!("drawing.max_undo must be at least 1, using 1");
            self.drawing.max_undo = 1;
        }

        clamp_f64(
            "gesture.extension_ratio",
            &mut self.gesture.extension_ratio,
            0.5,
            3.0,
        );
        clamp_f64(
            "gesture.pinch_threshold",
            &mut self.gesture.pinch_threshold,
            0.05,
            1.0,
        );
        clamp_f64(
            "gesture.min_confidence",
            &mut self.gesture.min_confidence,
            0.0,
            1.0,
        );
        if self.gesture.dwell_ms > 5000 {
            warn!(
                "Invalid gesture.dwell_ms {}, clamping to 5000",
                self.gesture.dwell_ms
            );
            self.gesture.dwell_ms = 5000;
        }
        if !(1..=30).contains(&self.gesture.smoothing_window) {
            warn!(
                "Invalid gesture.smoothing_window {}, clamping to 1-30 range",
                self.gesture.smoothing_window
            );
            self.gesture.smoothing_window = self.gesture.smoothing_window.clamp(1, 30);
        }

        if self.ui.button_width < 10 || self.ui.button_height < 10 {
            warn!(
                "Button size {}x{} is too small, using at least 10x10",
                self.ui.button_width, self.ui.button_height
            );
            self.ui.button_width = self.ui.button_width.max(10);
            self.ui.button_height = self.ui.button_height.max(10);
        }
        if self.ui.button_dwell_ms > 5000 {
            warn!(
                "Invalid ui.button_dwell_ms {}, clamping to 5000",
                self.ui.button_dwell_ms
            );
            self.ui.button_dwell_ms = 5000;
        }
        clamp_f64("ui.font_size", &mut self.ui.font_size, 6.0, 72.0);

        if !(5..=3600).contains(&self.session.autosave_interval_secs) {
            warn!(
                "Invalid session.autosave_interval_secs {}, clamping to 5-3600 range",
                self.session.autosave_interval_secs
            );
            self.session.autosave_interval_secs =
                self.session.autosave_interval_secs.clamp(5, 3600);
        }
        if !(1..=100).contains(&self.session.history_limit) {
            warn!(
                "Invalid session.history_limit {}, clamping to 1-100 range",
                self.session.history_limit
            );
            self.session.history_limit = self.session.history_limit.clamp(1, 100);
        }

        clamp_f64(
            "recognition.confidence_floor",
            &mut self.recognition.confidence_floor,
            0.0,
            1.0,
        );
        if !(1..=300).contains(&self.recognition.timeout_secs) {
            warn!(
                "Invalid recognition.timeout_secs {}, clamping to 1-300 range",
                self.recognition.timeout_secs
            );
            self.recognition.timeout_secs = self.recognition.timeout_secs.clamp(1, 300);
        }
        self.recognition
            .languages
            .retain(|lang| !lang.trim().is_empty());
        if self.recognition.languages.is_empty() {
            warn!("recognition.languages is empty, falling back to [\"es\", \"en\"]");
            self.recognition.languages = vec!["es".to_string(), "en".to_string()];
        }

        if !self.speech.engines.iter().any(|engine| !engine.network) {
            warn!("No offline speech engine configured; speech fails whenever the network does");
        }
        if !(1..=120).contains(&self.speech.timeout_secs) {
            warn!(
                "Invalid speech.timeout_secs {}, clamping to 1-120 range",
                self.speech.timeout_secs
            );
            self.speech.timeout_secs = self.speech.timeout_secs.clamp(1, 120);
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.device.baud_rate) {
            warn!(
                "Unsupported device.baud_rate {}, falling back to 9600",
                self.device.baud_rate
            );
            self.device.baud_rate = 9600;
        }

        clamp_f64("runtime.frame_rate", &mut self.runtime.frame_rate, 0.0, 240.0);
        if self.runtime.shutdown_grace_secs > 60 {
            warn!(
                "Invalid runtime.shutdown_grace_secs {}, clamping to 60",
                self.runtime.shutdown_grace_secs
            );
            self.runtime.shutdown_grace_secs = 60;
        }
        if self.runtime.preview_every_n_frames == 0 {
            warn!("runtime.preview_every_n_frames must be at least 1, using 1");
            self.runtime.preview_every_n_frames = 1;
        }
    }

    /// Returns the directory holding the configuration file (`~/.config/airscriber`).
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not find config directory")?
            .join("airscriber"))
    }

    /// Returns the path to the configuration file.
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The config directory path cannot be determined
    /// - The file exists but cannot be read
    /// - The file exists but contains invalid TOML syntax
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from an explicit path, or returns defaults if it does not exist.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config = Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        config.validate_and_clamp();
        Ok(config)
    }

    /// Parses a TOML document without validation.
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// JSON schema describing the configuration file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}

fn clamp_f64(name: &str, value: &mut f64, min: f64, max: f64) {
    if !value.is_finite() || !(min..=max).contains(value) {
        warn!("Invalid {} {:.2}, clamping to {}-{} range", name, value, min, max);
        *value = if value.is_finite() {
            value.clamp(min, max)
        } else {
            min
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.drawing.thickness, 3.0);
        assert_eq!(config.drawing.eraser_radius, 30.0);
        assert_eq!(config.gesture.dwell_ms, 500);
        assert_eq!(config.session.history_limit, 5);
        assert_eq!(config.recognition.languages, vec!["es", "en"]);
        assert_eq!(config.device.baud_rate, 9600);
        assert_eq!(config.ui.buttons.len(), 5);
        assert_eq!(config.ui.buttons[0].label, "Dibujar");
    }

    #[test]
    fn default_buttons_fit_default_canvas() {
        let config = Config::default();
        for button in &config.ui.buttons {
            assert!(button.x + config.ui.button_width <= config.drawing.width);
            assert!(button.y + config.ui.button_height <= config.drawing.height);
        }
    }

    #[test]
    fn parses_sections_and_custom_buttons() {
        let config = Config::from_toml(
            r#"
            [drawing]
            color = [255, 0, 0]
            background = "blanco"

            [[ui.buttons]]
            action = "draw"
            label = "Draw"
            x = 5
            y = 5

            [speech]
            engines = [{ name = "say", program = "say", args = ["{text}"] }]

            [session]
            compress = "off"
            storage = "custom"
            custom_directory = "/tmp/airscriber"
            "#,
        )
        .unwrap();

        assert_eq!(config.drawing.color, ColorSpec::Rgb([255, 0, 0]));
        assert_eq!(config.ui.buttons.len(), 1);
        assert_eq!(config.ui.buttons[0].action, ButtonAction::Draw);
        assert_eq!(config.speech.engines[0].program, "say");
        assert!(!config.speech.engines[0].network);
        assert_eq!(config.session.compress, SessionCompression::Off);
        assert_eq!(config.session.storage, SessionStorageMode::Custom);
    }

    #[test]
    fn validate_clamps_out_of_range_values() {
        let mut config = Config::from_toml(
            r#"
            [drawing]
            thickness = 500.0
            max_undo = 0

            [gesture]
            smoothing_window = 0
            min_confidence = 3.0

            [session]
            autosave_interval_secs = 1
            history_limit = 0

            [recognition]
            languages = []

            [device]
            baud_rate = 12345
            "#,
        )
        .unwrap();
        config.validate_and_clamp();

        assert_eq!(config.drawing.thickness, 50.0);
        assert_eq!(config.drawing.max_undo, 1);
        assert_eq!(config.gesture.smoothing_window, 1);
        assert_eq!(config.gesture.min_confidence, 1.0);
        assert_eq!(config.session.autosave_interval_secs, 5);
        assert_eq!(config.session.history_limit, 1);
        assert_eq!(config.recognition.languages, vec!["es", "en"]);
        assert_eq!(config.device.baud_rate, 9600);
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.runtime.frame_rate, 30.0);
    }

    #[test]
    fn load_from_reports_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[drawing\nthickness = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn color_spec_converts_names_and_rgb() {
        use crate::draw::{GREEN, WHITE};
        assert_eq!(ColorSpec::Name("blanco".into()).to_color(), WHITE);
        assert_eq!(ColorSpec::Name("nope".into()).to_color(), GREEN);
        assert_eq!(ColorSpec::Rgb([0, 255, 0]).to_color(), GREEN);
    }

    #[test]
    fn schema_mentions_every_section() {
        let schema = serde_json::to_string(&Config::json_schema()).unwrap();
        for section in ["drawing", "gesture", "ui", "session", "recognition", "speech", "device"] {
            assert!(schema.contains(section), "missing {section}");
        }
    }
}
