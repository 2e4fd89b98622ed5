use airscriber::app::canvas_from_config;
use airscriber::config::{ButtonAction, ColorSpec, Config};
use airscriber::draw::{Bitmap, CanvasState, Point};
use airscriber::gesture::{GestureEvent, GestureLabel};
use airscriber::input::{ButtonLayout, InputSettings, InputState, Mode};
use airscriber::ui::{PreviewStyle, render_preview};

fn make_state(config: &Config, canvas: &CanvasState) -> InputState {
    InputState::new(
        InputSettings::from_config(config),
        ButtonLayout::from_config(&config.ui, canvas.width(), canvas.height()),
    )
}

fn event(t: u64, label: GestureLabel, confirmed: Option<GestureLabel>, at: (i32, i32)) -> GestureEvent {
    GestureEvent {
        label,
        confirmed,
        confidence: 0.9,
        timestamp_ms: t,
        fingertip: Some(Point::new(at.0, at.1)),
    }
}

fn button_center(state: &InputState, action: ButtonAction) -> (i32, i32) {
    let index = state.layout().find(action).unwrap();
    let rect = state.layout().buttons()[index].rect;
    (rect.x + rect.width / 2, rect.y + rect.height / 2)
}

fn assert_rgb_near(bitmap: &Bitmap, x: i32, y: i32, expected: (u8, u8, u8)) {
    let (r, g, b, _) = bitmap.pixel(x, y).unwrap();
    let close = |a: u8, e: u8| (a as i32 - e as i32).abs() <= 2;
    assert!(
        close(r, expected.0) && close(g, expected.1) && close(b, expected.2),
        "pixel ({}, {}) is {:?}, expected {:?}",
        x,
        y,
        (r, g, b),
        expected
    );
}

#[test]
fn preview_has_canvas_size_and_draws_buttons() {
    let config = Config::default();
    let canvas = canvas_from_config(&config);
    let state = make_state(&config, &canvas);

    let bitmap = render_preview(&canvas, &state, &PreviewStyle::from_config(&config.ui), 0).unwrap();
    assert_eq!((bitmap.width, bitmap.height), (canvas.width(), canvas.height()));

    assert!(!state.layout().buttons().is_empty());
    for button in state.layout().buttons() {
        assert_rgb_near(&bitmap, button.rect.x + 4, button.rect.y + 4, (200, 200, 200));
    }
}

#[test]
fn status_bar_can_be_hidden() {
    let mut config = Config::default();
    config.drawing.background = ColorSpec::Name("white".to_string());
    let canvas = canvas_from_config(&config);
    let state = make_state(&config, &canvas);
    let bottom = canvas.height() - 2;

    let mut style = PreviewStyle::from_config(&config.ui);
    let with_bar = render_preview(&canvas, &state, &style, 0).unwrap();
    let (r, _, _, _) = with_bar.pixel(2, bottom).unwrap();
    assert!(r < 128, "status bar should darken the bottom edge, got {}", r);

    style.show_status_bar = false;
    let without_bar = render_preview(&canvas, &state, &style, 0).unwrap();
    assert_rgb_near(&without_bar, 2, bottom, (255, 255, 255));
}

#[test]
fn drawing_shows_active_stroke_and_highlighted_button() {
    let config = Config::default();
    let mut canvas = canvas_from_config(&config);
    let mut state = make_state(&config, &canvas);

    let draw = button_center(&state, ButtonAction::Draw);
    let dwell = config.ui.button_dwell_ms;
    state.handle_gesture(&event(0, GestureLabel::Fist, Some(GestureLabel::Fist), draw), &mut canvas);
    state.handle_gesture(
        &event(dwell + 10, GestureLabel::Fist, Some(GestureLabel::Fist), draw),
        &mut canvas,
    );

    let t = dwell + 100;
    for (i, x) in [300, 320, 340].into_iter().enumerate() {
        state.handle_gesture(
            &event(t + i as u64 * 33, GestureLabel::IndexOnly, Some(GestureLabel::IndexOnly), (x, 300)),
            &mut canvas,
        );
    }
    assert_eq!(state.mode(), Mode::Drawing);
    assert!(canvas.active_stroke().is_some());

    let bitmap = render_preview(&canvas, &state, &PreviewStyle::from_config(&config.ui), t + 100).unwrap();
    // Default pen is green
    assert_rgb_near(&bitmap, 310, 300, (0, 255, 0));

    // The Dibujar button is drawn in the selected color
    let index = state.layout().find(ButtonAction::Draw).unwrap();
    let rect = state.layout().buttons()[index].rect;
    assert_rgb_near(&bitmap, rect.x + 4, rect.y + 4, (0, 255, 255));
}

#[test]
fn preview_png_is_written() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("preview.png");
    let config = Config::default();
    let canvas = canvas_from_config(&config);
    let state = make_state(&config, &canvas);

    render_preview(&canvas, &state, &PreviewStyle::default(), 0)
        .unwrap()
        .write_png(&path)
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}
