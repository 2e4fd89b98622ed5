use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{SpeechConfig, SpeechEngineConfig};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Errors produced while speaking text.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine {0} is not available")]
    Unavailable(String),

    #[error("failed to start {engine}: {source}")]
    Spawn {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine} exited with {status}: {stderr}")]
    ExitStatus {
        engine: String,
        status: String,
        stderr: String,
    },

    #[error("{engine} did not finish within {after:?}")]
    Timeout { engine: String, after: Duration },

    #[error("no speech engine configured")]
    NoEngines,

    #[error("all speech engines failed: {}", .0.join("; "))]
    AllEnginesFailed(Vec<String>),
}

/// A way of turning text into audible speech.
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the engine can run on this machine right now.
    fn is_available(&self) -> bool;

    /// Engine needs network access (cloud voices).
    fn is_network(&self) -> bool;

    /// Speak `text`, blocking until playback finished.
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Speech engine backed by an external command such as `espeak-ng`.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    program: String,
    args: Vec<String>,
    network: bool,
    language: String,
    voice: String,
    rate: u32,
    timeout: Duration,
}

impl CommandEngine {
    pub fn from_config(engine: &SpeechEngineConfig, speech: &SpeechConfig) -> Self {
        Self {
            name: engine.name.clone(),
            program: engine.program.clone(),
            args: engine.args.clone(),
            network: engine.network,
            language: speech.language.clone(),
            voice: speech
                .voice
                .clone()
                .unwrap_or_else(|| speech.language.clone()),
            rate: speech.rate,
            timeout: Duration::from_secs(speech.timeout_secs.max(1)),
        }
    }

    /// Arguments with placeholders substituted for one utterance.
    pub fn render_args(&self, text: &str) -> Vec<String> {
        let rate = self.rate.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{lang}", &self.language)
                    .replace("{voice}", &self.voice)
                    .replace("{rate}", &rate)
                    .replace("{text}", text)
            })
            .collect()
    }

    fn resolve_program(&self) -> Option<PathBuf> {
        if self.program.contains('/') {
            let path = PathBuf::from(&self.program);
            return is_executable(&path).then_some(path);
        }
        let paths = env::var_os("PATH")?;
        env::split_paths(&paths)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| is_executable(candidate))
    }
}

impl SpeechEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.resolve_program().is_some()
    }

    fn is_network(&self) -> bool {
        self.network
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let program = self
            .resolve_program()
            .ok_or_else(|| SpeechError::Unavailable(self.name.clone()))?;

        log::debug!("Speaking with {} ({})", self.name, program.display());
        let mut child = Command::new(&program)
            .args(self.render_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                engine: self.name.clone(),
                source,
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SpeechError::Timeout {
                        engine: self.name.clone(),
                        after: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(SpeechError::Spawn {
                        engine: self.name.clone(),
                        source,
                    });
                }
            }
        };

        if status.success() {
            return Ok(());
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        Err(SpeechError::ExitStatus {
            engine: self.name.clone(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
