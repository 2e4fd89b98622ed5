use crate::config::{SessionCompression, SessionConfig, SessionStorageMode};
use crate::util::expand_tilde;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_AUTO_COMPRESS_THRESHOLD_BYTES: u64 = 100 * 1024; // 100 KiB

/// Prefix shared by all session files.
pub const SESSION_FILE_PREFIX: &str = "autosave-";
/// Extension of session files (plain or gzip-compressed JSON).
pub const SESSION_FILE_SUFFIX: &str = ".json";

/// Compression preference for session files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    /// Always write plain JSON.
    Off,
    /// Always write gzip-compressed JSON.
    On,
    /// Write gzip when payload exceeds the configured threshold.
    Auto,
}

/// Runtime options derived from configuration for session persistence.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub base_dir: PathBuf,
    pub enabled: bool,
    pub autosave_interval: Duration,
    pub history_limit: usize,
    pub max_strokes: usize,
    pub max_file_size_bytes: u64,
    pub compression: CompressionMode,
    pub auto_compress_threshold_bytes: u64,
    pub auto_recover: bool,
}

impl SessionOptions {
    /// Creates a basic options struct with sensible defaults. Intended mainly for tests.
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            enabled: true,
            autosave_interval: Duration::from_secs(60),
            history_limit: 5,
            max_strokes: 10_000,
            max_file_size_bytes: 10 * 1024 * 1024,
            compression: CompressionMode::Auto,
            auto_compress_threshold_bytes: DEFAULT_AUTO_COMPRESS_THRESHOLD_BYTES,
            auto_recover: true,
        }
    }

    pub fn session_file_path(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!(
            "{}{}{}",
            SESSION_FILE_PREFIX, session_id, SESSION_FILE_SUFFIX
        ))
    }

    pub fn lock_file_path(&self) -> PathBuf {
        self.base_dir.join("sessions.lock")
    }

    /// File present while a process is running; left behind by crashes.
    pub fn marker_file_path(&self) -> PathBuf {
        self.base_dir.join("running.marker")
    }
}

/// Build runtime session options from configuration values.
pub fn options_from_config(session_cfg: &SessionConfig, config_dir: &Path) -> Result<SessionOptions> {
    let base_dir = match session_cfg.storage {
        SessionStorageMode::Auto => {
            let root = dirs::data_dir().unwrap_or_else(|| config_dir.to_path_buf());
            root.join("airscriber")
        }
        SessionStorageMode::Config => config_dir.to_path_buf(),
        SessionStorageMode::Custom => {
            let raw = session_cfg.custom_directory.as_ref().ok_or_else(|| {
                anyhow!("session.custom_directory must be set when storage = \"custom\"")
            })?;
            let expanded = expand_tilde(raw);
            if expanded.as_os_str().is_empty() {
                return Err(anyhow!(
                    "session.custom_directory resolved to an empty path"
                ));
            }
            expanded
        }
    };

    let mut options = SessionOptions::new(base_dir);
    options.enabled = session_cfg.enabled;
    options.autosave_interval = Duration::from_secs(session_cfg.autosave_interval_secs.max(1));
    options.history_limit = session_cfg.history_limit.max(1);
    options.max_strokes = session_cfg.max_strokes;
    options.max_file_size_bytes = session_cfg
        .max_file_size_mb
        .saturating_mul(1024 * 1024)
        .max(1);
    options.auto_compress_threshold_bytes = session_cfg
        .auto_compress_threshold_kb
        .saturating_mul(1024)
        .max(1);
    options.compression = match session_cfg.compress {
        SessionCompression::Auto => CompressionMode::Auto,
        SessionCompression::On => CompressionMode::On,
        SessionCompression::Off => CompressionMode::Off,
    };
    options.auto_recover = session_cfg.auto_recover;

    Ok(options)
}
