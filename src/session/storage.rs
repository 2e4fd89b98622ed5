use super::options::{SESSION_FILE_PREFIX, SESSION_FILE_SUFFIX, SessionOptions};
use super::snapshot;
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Result of clearing on-disk session data.
#[derive(Debug, Clone, Copy)]
pub struct ClearOutcome {
    pub removed_sessions: usize,
    pub removed_lock: bool,
    pub removed_marker: bool,
}

/// Details about one session file for CLI reporting.
#[derive(Debug, Clone)]
pub struct SessionFileInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
    /// Stroke count, or `None` when the file could not be loaded
    pub stroke_count: Option<usize>,
    pub compressed: bool,
    pub error: Option<String>,
}

/// Summary information about the session directory.
#[derive(Debug, Clone)]
pub struct SessionInspection {
    pub base_dir: PathBuf,
    pub enabled: bool,
    pub history_limit: usize,
    pub autosave_interval_secs: u64,
    /// Oldest first
    pub files: Vec<SessionFileInfo>,
    /// A previous run did not shut down cleanly
    pub marker_present: bool,
}

impl SessionInspection {
    pub fn newest_loadable(&self) -> Option<&SessionFileInfo> {
        self.files.iter().rev().find(|f| f.stroke_count.is_some())
    }
}

/// Lists session files in `dir`, oldest first.
///
/// Session ids start with a UTC timestamp, so name order is save order.
pub fn list_session_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read session directory {}", dir.display()));
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && is_session_file_name(name)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_session_file_name(name: &str) -> bool {
    name.starts_with(SESSION_FILE_PREFIX)
        && name.ends_with(SESSION_FILE_SUFFIX)
        && name.len() > SESSION_FILE_PREFIX.len() + SESSION_FILE_SUFFIX.len()
}

/// Deletes the oldest session files beyond `history_limit`. Returns how many were removed.
pub(crate) fn evict_old_sessions(options: &SessionOptions) -> Result<usize> {
    let files = list_session_files(&options.base_dir)?;
    let limit = options.history_limit.max(1);
    if files.len() <= limit {
        return Ok(0);
    }

    let excess = files.len() - limit;
    let mut removed = 0;
    for path in files.into_iter().take(excess) {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Evicted old session {}", path.display());
                removed += 1;
            }
            Err(err) => warn!("failed to evict session {}: {}", path.display(), err),
        }
    }
    Ok(removed)
}

/// Remove persisted session files, the lock file and the crash marker.
pub fn clear_sessions(options: &SessionOptions) -> Result<ClearOutcome> {
    let mut removed_sessions = 0;
    for path in list_session_files(&options.base_dir)? {
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        removed_sessions += 1;
    }

    Ok(ClearOutcome {
        removed_sessions,
        removed_lock: remove_file_if_exists(&options.lock_file_path())?,
        removed_marker: remove_file_if_exists(&options.marker_file_path())?,
    })
}

/// Inspect the session directory for CLI reporting.
pub fn inspect_sessions(options: &SessionOptions) -> Result<SessionInspection> {
    let mut files = Vec::new();
    for path in list_session_files(&options.base_dir)? {
        let metadata = fs::metadata(&path).ok();
        let (stroke_count, compressed, error) = match snapshot::load_session(&path, options) {
            Ok(loaded) => (Some(loaded.file.canvas.strokes.len()), loaded.compressed, None),
            Err(err) => (None, false, Some(format!("{:#}", err))),
        };
        files.push(SessionFileInfo {
            size_bytes: metadata.as_ref().map_or(0, |m| m.len()),
            modified: metadata.as_ref().and_then(|m| m.modified().ok()),
            path,
            stroke_count,
            compressed,
            error,
        });
    }

    Ok(SessionInspection {
        base_dir: options.base_dir.clone(),
        enabled: options.enabled,
        history_limit: options.history_limit,
        autosave_interval_secs: options.autosave_interval.as_secs(),
        files,
        marker_present: options.marker_file_path().exists(),
    })
}

/// Crash-detection marker held for the lifetime of a run.
///
/// Created at startup and removed on clean shutdown. Finding it at startup
/// means the previous run ended without shutting down.
#[derive(Debug)]
pub struct RunMarker {
    path: PathBuf,
    previous_run_unclean: bool,
}

impl RunMarker {
    pub fn acquire(options: &SessionOptions) -> Result<Self> {
        fs::create_dir_all(&options.base_dir).with_context(|| {
            format!(
                "failed to create session directory {}",
                options.base_dir.display()
            )
        })?;

        let path = options.marker_file_path();
        let previous_run_unclean = path.exists();
        if previous_run_unclean {
            warn!(
                "Previous run did not shut down cleanly (marker {} present)",
                path.display()
            );
        }

        let contents = format!("pid={}\nstarted={}\n", std::process::id(), Utc::now().to_rfc3339());
        fs::write(&path, contents)
            .with_context(|| format!("failed to write run marker {}", path.display()))?;

        Ok(Self {
            path,
            previous_run_unclean,
        })
    }

    pub fn previous_run_unclean(&self) -> bool {
        self.previous_run_unclean
    }

    /// Removes the marker after a clean shutdown.
    pub fn release(self) -> Result<()> {
        if remove_file_if_exists(&self.path)? {
            info!("Clean shutdown recorded");
        }
        Ok(())
    }
}

fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        Ok(true)
    } else {
        Ok(false)
    }
}
