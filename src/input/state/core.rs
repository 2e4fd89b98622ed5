//! Interaction state owned by the frame loop.

use crate::config::{ButtonAction, Config};
use crate::draw::{Color, Point};
use crate::gesture::GestureLabel;
use crate::input::{buttons::ButtonLayout, mode::Mode};

/// How long a status message stays visible when no duration is given.
pub const DEFAULT_MESSAGE_MS: u64 = 3000;

/// Requests the frame loop has to carry out after a gesture was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Rasterize the canvas and hand it to the recognition dispatcher
    Recognize,
    /// Shut down the application
    Exit,
}

/// A fist resting on a button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Selection {
    /// Index into the button layout
    pub button: usize,
    /// Timestamp at which the fist entered the hit-box
    pub entered_ms: u64,
    /// Set once the button has fired; it stays latched until the fist leaves
    pub fired: bool,
    /// Mode to fall back to when the fist leaves before the dwell completes
    pub return_mode: Mode,
}

/// Status line text with its display time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StatusMessage {
    pub text: String,
    pub duration_ms: u64,
    /// Frame timestamp at which the message was first shown
    pub shown_at: Option<u64>,
}

/// Pen and selection parameters taken from configuration.
#[derive(Debug, Clone)]
pub struct InputSettings {
    pub color: Color,
    pub thickness: f64,
    pub eraser_radius: f64,
    pub min_confidence: f64,
    pub button_dwell_ms: u64,
}

impl InputSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            color: config.drawing.color.to_color(),
            thickness: config.drawing.thickness,
            eraser_radius: config.drawing.eraser_radius,
            min_confidence: config.gesture.min_confidence,
            button_dwell_ms: config.ui.button_dwell_ms,
        }
    }
}

/// Mode state machine plus the UI state the preview renders.
///
/// Gestures come in through [`InputState::handle_gesture`]; canvas mutations
/// are applied directly and longer work is returned as [`Action`]s.
pub struct InputState {
    /// Current interaction mode
    pub(crate) mode: Mode,
    pub(crate) settings: InputSettings,
    pub(crate) layout: ButtonLayout,
    pub(crate) selection: Option<Selection>,
    /// Last fingertip position (for the hand indicator)
    pub(crate) hand: Option<Point>,
    /// Last raw gesture label
    pub(crate) last_label: GestureLabel,
    /// Transient message shown in the status line
    pub(crate) message: Option<StatusMessage>,
    /// Whether the Salir button fired
    pub should_exit: bool,
    /// Whether the preview needs to be redrawn
    pub needs_redraw: bool,
}

impl InputState {
    pub fn new(settings: InputSettings, layout: ButtonLayout) -> Self {
        Self {
            mode: Mode::Idle,
            settings,
            layout,
            selection: None,
            hand: None,
            last_label: GestureLabel::Unknown,
            message: None,
            should_exit: false,
            needs_redraw: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn layout(&self) -> &ButtonLayout {
        &self.layout
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    pub fn hand_position(&self) -> Option<Point> {
        self.hand
    }

    pub fn last_label(&self) -> GestureLabel {
        self.last_label
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.text.as_str())
    }

    /// Replaces the status line message for [`DEFAULT_MESSAGE_MS`].
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.set_message_for(message, DEFAULT_MESSAGE_MS);
    }

    /// Replaces the status line message for `duration_ms` of frame time.
    ///
    /// The clock starts at the next handled frame, so messages set between
    /// frames are not cut short.
    pub fn set_message_for(&mut self, message: impl Into<String>, duration_ms: u64) {
        self.message = Some(StatusMessage {
            text: message.into(),
            duration_ms,
            shown_at: None,
        });
        self.needs_redraw = true;
    }

    /// Clears the message once its time is up.
    pub(crate) fn expire_message(&mut self, now_ms: u64) {
        let Some(message) = self.message.as_mut() else {
            return;
        };
        let shown_at = *message.shown_at.get_or_insert(now_ms);
        if now_ms.saturating_sub(shown_at) >= message.duration_ms {
            self.message = None;
            self.needs_redraw = true;
        }
    }

    /// Index of the button to draw highlighted: the one under selection, else the
    /// button of the current mode.
    pub fn highlighted_button(&self) -> Option<usize> {
        if let Some(selection) = self.selection {
            return Some(selection.button);
        }
        self.mode
            .button_action()
            .and_then(|action| self.layout.find(action))
    }

    /// Progress of the running button dwell (0.0 - 1.0), if a selection is pending.
    pub fn selection_progress(&self, now_ms: u64) -> Option<f64> {
        let selection = self.selection.filter(|s| !s.fired)?;
        if self.settings.button_dwell_ms == 0 {
            return Some(1.0);
        }
        let elapsed = now_ms.saturating_sub(selection.entered_ms) as f64;
        Some((elapsed / self.settings.button_dwell_ms as f64).min(1.0))
    }

    pub(crate) fn button_action(&self, index: usize) -> Option<ButtonAction> {
        self.layout.get(index).map(|b| b.action)
    }

    /// One-line description of the current state for the status bar.
    pub fn status_text(&self) -> String {
        let mut text = format!("Mode: {} | Gesture: {}", self.mode, self.last_label);
        if let Some(message) = &self.message {
            text.push_str(" | ");
            text.push_str(&message.text);
        }
        text
    }
}
