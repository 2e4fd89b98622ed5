mod core;
mod gestures;

pub use core::{Action, DEFAULT_MESSAGE_MS, InputSettings, InputState};
