use std::sync::Arc;

use super::engine::{CommandEngine, SpeechEngine, SpeechError};
use crate::config::SpeechConfig;

/// Ordered list of speech engines with fallback.
#[derive(Clone)]
pub struct SpeechChain {
    engines: Vec<Arc<dyn SpeechEngine>>,
    announce_template: String,
}

impl SpeechChain {
    pub fn new(engines: Vec<Arc<dyn SpeechEngine>>, announce_template: impl Into<String>) -> Self {
        Self {
            engines,
            announce_template: announce_template.into(),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        let engines: Vec<Arc<dyn SpeechEngine>> = config
            .engines
            .iter()
            .map(|engine| {
                Arc::new(CommandEngine::from_config(engine, config)) as Arc<dyn SpeechEngine>
            })
            .collect();

        if !engines.iter().any(|engine| !engine.is_network()) {
            log::warn!("No offline speech engine configured; speech needs network access");
        }

        Self::new(engines, config.announce_template.clone())
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|engine| engine.name()).collect()
    }

    /// The sentence spoken for a recognized text.
    pub fn announcement(&self, text: &str) -> String {
        self.announce_template.replace("{text}", text)
    }

    /// Speak the announcement for `text`, returning the engine that succeeded.
    pub fn announce(&self, text: &str) -> Result<String, SpeechError> {
        self.speak(&self.announcement(text))
    }

    /// Try each engine in order; unavailable engines are skipped.
    pub fn speak(&self, text: &str) -> Result<String, SpeechError> {
        if self.engines.is_empty() {
            return Err(SpeechError::NoEngines);
        }

        let mut failures = Vec::new();
        for engine in &self.engines {
            if !engine.is_available() {
                log::debug!("Speech engine {} not available, skipping", engine.name());
                failures.push(format!("{}: not available", engine.name()));
                continue;
            }
            match engine.speak(text) {
                Ok(()) => {
                    log::info!("Spoke {} chars with {}", text.chars().count(), engine.name());
                    return Ok(engine.name().to_string());
                }
                Err(err) => {
                    log::warn!("Speech engine {} failed: {}", engine.name(), err);
                    failures.push(err.to_string());
                }
            }
        }
        Err(SpeechError::AllEnginesFailed(failures))
    }
}
