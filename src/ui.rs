//! Preview compositor.
//!
//! Draws what the user would see on the camera window: the canvas, the
//! on-screen buttons with their dwell progress, a hand indicator and a status
//! line. The result is an owned [`Bitmap`] that the frame loop writes out as
//! a PNG.

use crate::config::UiConfig;
use crate::draw::{
    BLACK, Bitmap, CanvasState, Color, RenderError, render_background, render_strokes,
};
use crate::draw::render::render_stroke;
use crate::input::{Button, InputState, Mode};
use cairo::{Format, ImageSurface};

// Status bar layout
const STATUS_PADDING_X: f64 = 8.0;
const STATUS_PADDING_Y: f64 = 4.0;
const STATUS_BG: Color = Color::new(0.0, 0.0, 0.0, 0.75);

// Buttons
const BUTTON_BORDER_WIDTH: f64 = 2.0;
const PROGRESS_BAR_HEIGHT: f64 = 5.0;

// Hand indicator
const HAND_DOT_RADIUS: f64 = 6.0;
const HAND_RING_WIDTH: f64 = 2.0;
const SELECT_RING_RADIUS: f64 = 14.0;

/// Colors and font used by the preview overlay.
#[derive(Debug, Clone)]
pub struct PreviewStyle {
    pub button_color: Color,
    pub selected_color: Color,
    pub text_color: Color,
    pub font_family: String,
    pub font_size: f64,
    pub show_status_bar: bool,
}

impl PreviewStyle {
    pub fn from_config(ui: &UiConfig) -> Self {
        Self {
            button_color: ui.button_color.to_color(),
            selected_color: ui.selected_color.to_color(),
            text_color: ui.text_color.to_color(),
            font_family: ui.font_family.clone(),
            font_size: ui.font_size,
            show_status_bar: ui.show_status_bar,
        }
    }

    fn font(&self) -> pango::FontDescription {
        pango::FontDescription::from_string(&format!("{} {}", self.font_family, self.font_size))
    }
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self::from_config(&UiConfig::default())
    }
}

/// Composites the canvas and the interaction overlay into a new bitmap.
///
/// `now_ms` is the timestamp of the current frame; it drives the button dwell
/// progress bar.
pub fn render_preview(
    canvas: &CanvasState,
    state: &InputState,
    style: &PreviewStyle,
    now_ms: u64,
) -> Result<Bitmap, RenderError> {
    let mut surface = ImageSurface::create(Format::ARgb32, canvas.width(), canvas.height())?;
    {
        let ctx = cairo::Context::new(&surface)?;
        render_background(&ctx, canvas.background());
        render_strokes(&ctx, canvas.strokes());
        if let Some(active) = canvas.active_stroke() {
            render_stroke(&ctx, &active.points, active.color, active.thickness);
        }

        render_buttons(&ctx, state, style, now_ms);
        render_hand_indicator(&ctx, state, style);

        if style.show_status_bar {
            render_status_bar(&ctx, &state.status_text(), style, canvas.height());
        }
    }
    Bitmap::from_surface(&mut surface)
}

/// Draws every button, highlighting the selected one and its dwell progress.
pub fn render_buttons(ctx: &cairo::Context, state: &InputState, style: &PreviewStyle, now_ms: u64) {
    let highlighted = state.highlighted_button();
    let progress = state.selection_progress(now_ms);
    let font = style.font();

    for (index, button) in state.layout().buttons().iter().enumerate() {
        let selected = highlighted == Some(index);
        render_button(ctx, button, style, &font, selected);

        if selected && let Some(progress) = progress {
            let rect = button.rect;
            style.text_color.apply(ctx);
            ctx.rectangle(
                rect.x as f64,
                (rect.y + rect.height) as f64 - PROGRESS_BAR_HEIGHT,
                rect.width as f64 * progress,
                PROGRESS_BAR_HEIGHT,
            );
            let _ = ctx.fill();
        }
    }
}

fn render_button(
    ctx: &cairo::Context,
    button: &Button,
    style: &PreviewStyle,
    font: &pango::FontDescription,
    selected: bool,
) {
    let rect = button.rect;
    let (x, y, w, h) = (
        rect.x as f64,
        rect.y as f64,
        rect.width as f64,
        rect.height as f64,
    );

    let fill = if selected {
        style.selected_color
    } else {
        style.button_color
    };
    fill.apply(ctx);
    ctx.rectangle(x, y, w, h);
    let _ = ctx.fill();

    style.text_color.apply(ctx);
    ctx.set_line_width(BUTTON_BORDER_WIDTH);
    ctx.rectangle(x, y, w, h);
    let _ = ctx.stroke();

    let layout = pangocairo::functions::create_layout(ctx);
    layout.set_font_description(Some(font));
    layout.set_text(&button.label);
    let (text_w, text_h) = layout.pixel_size();
    ctx.move_to(
        x + (w - text_w as f64) / 2.0,
        y + (h - text_h as f64) / 2.0,
    );
    // Black labels on light buttons
    label_color(fill, style.text_color).apply(ctx);
    pangocairo::functions::show_layout(ctx, &layout);
}

/// Picks whichever of `preferred` or black contrasts better with `fill`.
fn label_color(fill: Color, preferred: Color) -> Color {
    if (fill.luminance() - preferred.luminance()).abs() >= fill.luminance() {
        preferred
    } else {
        BLACK
    }
}

/// Marks the fingertip: a dot in the pen color while drawing, the eraser
/// footprint while erasing, a ring otherwise.
pub fn render_hand_indicator(ctx: &cairo::Context, state: &InputState, style: &PreviewStyle) {
    let Some(hand) = state.hand_position() else {
        return;
    };
    let (x, y) = (hand.x as f64, hand.y as f64);
    let settings = state.settings();

    match state.mode() {
        Mode::Drawing => {
            settings.color.apply(ctx);
            ctx.arc(x, y, HAND_DOT_RADIUS, 0.0, 2.0 * std::f64::consts::PI);
            let _ = ctx.fill();
        }
        Mode::Erasing => {
            style.text_color.apply(ctx);
            ctx.set_line_width(HAND_RING_WIDTH);
            ctx.arc(
                x,
                y,
                settings.eraser_radius.max(HAND_DOT_RADIUS),
                0.0,
                2.0 * std::f64::consts::PI,
            );
            let _ = ctx.stroke();
        }
        Mode::Idle | Mode::Selecting => {
            style.selected_color.apply(ctx);
            ctx.set_line_width(HAND_RING_WIDTH);
            ctx.arc(x, y, SELECT_RING_RADIUS, 0.0, 2.0 * std::f64::consts::PI);
            let _ = ctx.stroke();
        }
    }
}

/// Draws the status line along the bottom edge.
pub fn render_status_bar(
    ctx: &cairo::Context,
    status_text: &str,
    style: &PreviewStyle,
    screen_height: i32,
) {
    let layout = pangocairo::functions::create_layout(ctx);
    layout.set_font_description(Some(&style.font()));
    layout.set_text(status_text);
    let (text_w, text_h) = layout.pixel_size();

    let bar_height = text_h as f64 + STATUS_PADDING_Y * 2.0;
    let bar_y = screen_height as f64 - bar_height;

    STATUS_BG.apply(ctx);
    ctx.rectangle(
        0.0,
        bar_y,
        text_w as f64 + STATUS_PADDING_X * 2.0,
        bar_height,
    );
    let _ = ctx.fill();

    style.text_color.apply(ctx);
    ctx.move_to(STATUS_PADDING_X, bar_y + STATUS_PADDING_Y);
    pangocairo::functions::show_layout(ctx, &layout);
}
