//! Text-to-speech through external command-line engines.

mod chain;
mod engine;

pub use chain::SpeechChain;
pub use engine::{CommandEngine, SpeechEngine, SpeechError};
