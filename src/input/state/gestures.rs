//! Gesture handling: button selection and canvas mutation.

use super::core::{Action, InputState, Selection};
use crate::config::ButtonAction;
use crate::draw::{CanvasState, Point};
use crate::gesture::{GestureEvent, GestureLabel};
use crate::input::mode::Mode;

/// Display time for mode change confirmations.
const SHORT_MESSAGE_MS: u64 = 2000;
const PENDING_MESSAGE_MS: u64 = 10_000;

impl InputState {
    /// Processes one classified frame.
    ///
    /// Confirmed labels drive mode changes through button selection; raw labels
    /// drive drawing and erasing. Returns work the frame loop must perform.
    pub fn handle_gesture(&mut self, event: &GestureEvent, canvas: &mut CanvasState) -> Vec<Action> {
        let mut actions = Vec::new();
        self.expire_message(event.timestamp_ms);

        let label = if event.confidence < self.settings.min_confidence {
            GestureLabel::Unknown
        } else {
            event.label
        };
        if label != self.last_label || event.fingertip != self.hand {
            self.needs_redraw = true;
        }
        self.last_label = label;
        self.hand = event.fingertip;

        let hit = event.fingertip.and_then(|p| self.layout.hit_test(p));

        if event.confirmed == Some(GestureLabel::Fist)
            && let Some(button) = hit
        {
            self.select(button, event.timestamp_ms, canvas, &mut actions);
            return actions;
        }

        if let Some(selection) = self.selection.take() {
            if !selection.fired {
                log::debug!(
                    "Left button {} before dwell completed, back to {}",
                    selection.button,
                    selection.return_mode
                );
                self.mode = selection.return_mode;
            }
            self.needs_redraw = true;
        }

        match self.mode {
            Mode::Drawing => self.draw(label, event.fingertip, hit, canvas),
            Mode::Erasing => {
                if label != GestureLabel::Unknown
                    && hit.is_none()
                    && let Some(point) = event.fingertip
                    && canvas.erase_at(point, self.settings.eraser_radius)
                {
                    self.needs_redraw = true;
                }
            }
            Mode::Idle | Mode::Selecting => {}
        }

        actions
    }

    fn draw(
        &mut self,
        label: GestureLabel,
        fingertip: Option<Point>,
        hit: Option<usize>,
        canvas: &mut CanvasState,
    ) {
        match fingertip {
            Some(point) if label == GestureLabel::IndexOnly && hit.is_none() => {
                if canvas.active_stroke().is_some() {
                    canvas.extend_stroke(point);
                } else if let Err(err) = canvas.begin_stroke(
                    self.mode,
                    point,
                    self.settings.color,
                    self.settings.thickness,
                ) {
                    log::warn!("Ignoring stroke start: {}", err);
                }
                self.needs_redraw = true;
            }
            _ => {
                if canvas.seal_stroke() {
                    self.needs_redraw = true;
                }
            }
        }
    }

    fn select(
        &mut self,
        button: usize,
        now_ms: u64,
        canvas: &mut CanvasState,
        actions: &mut Vec<Action>,
    ) {
        let selection = match self.selection {
            Some(current) if current.button == button => current,
            previous => {
                canvas.seal_stroke();
                let return_mode = previous.map_or(self.mode, |s| {
                    if s.fired { self.mode } else { s.return_mode }
                });
                let selection = Selection {
                    button,
                    entered_ms: now_ms,
                    fired: false,
                    return_mode,
                };
                self.mode = Mode::Selecting;
                self.needs_redraw = true;
                selection
            }
        };
        self.selection = Some(selection);

        if selection.fired
            || now_ms.saturating_sub(selection.entered_ms) < self.settings.button_dwell_ms
        {
            return;
        }

        self.selection = Some(Selection {
            fired: true,
            ..selection
        });
        self.needs_redraw = true;

        let Some(action) = self.button_action(button) else {
            return;
        };
        self.fire(action, selection.return_mode, canvas, actions);
    }

    fn fire(
        &mut self,
        action: ButtonAction,
        previous: Mode,
        canvas: &mut CanvasState,
        actions: &mut Vec<Action>,
    ) {
        let target = match action {
            ButtonAction::Draw => Mode::Drawing,
            ButtonAction::Erase => Mode::Erasing,
            ButtonAction::Save | ButtonAction::Clear | ButtonAction::Exit => Mode::Idle,
        };
        if target == previous && matches!(action, ButtonAction::Draw | ButtonAction::Erase) {
            log::debug!("Already in {} mode", target);
        } else {
            log::info!("Button {:?}: {} -> {}", action, previous, target);
        }
        self.mode = target;

        match action {
            ButtonAction::Draw => self.set_message_for("Modo dibujo activado", SHORT_MESSAGE_MS),
            ButtonAction::Erase => self.set_message_for("Modo borrador activado", SHORT_MESSAGE_MS),
            ButtonAction::Save => {
                self.set_message_for("Guardando y reconociendo texto...", PENDING_MESSAGE_MS);
                actions.push(Action::Recognize);
            }
            ButtonAction::Clear => {
                canvas.clear();
                self.set_message_for("Lienzo limpiado", SHORT_MESSAGE_MS);
            }
            ButtonAction::Exit => {
                self.should_exit = true;
                actions.push(Action::Exit);
            }
        }
    }
}
