//! Gesture-driven mode state machine.
//!
//! This module turns classified gestures into drawing actions. It holds the
//! current interaction mode (idle, drawing, erasing, selecting), hit-tests the
//! fingertip against the on-screen buttons and applies stroke and eraser
//! operations to the canvas.

pub mod buttons;
pub mod mode;
pub mod state;

// Re-export commonly used types at module level
pub use buttons::{Button, ButtonLayout};
pub use mode::Mode;
pub use state::{Action, DEFAULT_MESSAGE_MS, InputSettings, InputState};
