//! On-screen button layout and hit-testing.

use crate::config::{ButtonAction, UiConfig};
use crate::draw::Point;
use crate::util::Rect;

const RELAYOUT_MARGIN: i32 = 10;

/// A selectable button with its hit-box in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub action: ButtonAction,
    pub label: String,
    pub rect: Rect,
}

/// The set of buttons drawn over the canvas.
#[derive(Debug, Clone, Default)]
pub struct ButtonLayout {
    buttons: Vec<Button>,
}

impl ButtonLayout {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self { buttons }
    }

    /// Builds the layout from configuration.
    ///
    /// When any configured button falls outside the canvas, all buttons are
    /// redistributed in rows along the top edge.
    pub fn from_config(ui: &UiConfig, canvas_width: i32, canvas_height: i32) -> Self {
        let (w, h) = (ui.button_width.max(1), ui.button_height.max(1));
        let fits = ui.buttons.iter().all(|b| {
            b.x >= 0 && b.y >= 0 && b.x + w <= canvas_width && b.y + h <= canvas_height
        });

        let per_row = (canvas_width / (w + RELAYOUT_MARGIN)).max(1) as usize;
        if !fits {
            log::warn!(
                "Buttons exceed the {}x{} canvas; redistributing {} per row",
                canvas_width,
                canvas_height,
                per_row
            );
        }

        let buttons = ui
            .buttons
            .iter()
            .enumerate()
            .filter_map(|(i, cfg)| {
                let (x, y) = if fits {
                    (cfg.x, cfg.y)
                } else {
                    let (row, col) = ((i / per_row) as i32, (i % per_row) as i32);
                    (
                        RELAYOUT_MARGIN + col * (w + RELAYOUT_MARGIN),
                        RELAYOUT_MARGIN + row * (h + RELAYOUT_MARGIN),
                    )
                };
                Rect::new(x, y, w, h).map(|rect| Button {
                    action: cfg.action,
                    label: cfg.label.clone(),
                    rect,
                })
            })
            .collect();

        Self { buttons }
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn get(&self, index: usize) -> Option<&Button> {
        self.buttons.get(index)
    }

    /// Index of the first button containing `point`.
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.buttons
            .iter()
            .position(|b| b.rect.contains(point.x, point.y))
    }

    /// Index of the first button bound to `action`.
    pub fn find(&self, action: ButtonAction) -> Option<usize> {
        self.buttons.iter().position(|b| b.action == action)
    }
}
