use super::options::{CompressionMode, SessionOptions};
use super::storage;
use crate::draw::CanvasSnapshot;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use flate2::{Compression, bufread::GzDecoder, write::GzEncoder};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const CURRENT_VERSION: u32 = 1;

/// On-disk representation of one saved session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub version: u32,
    pub session_id: String,
    /// RFC 3339 timestamp of the save
    pub saved_at: String,
    pub canvas: CanvasSnapshot,
}

impl SessionFile {
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.saved_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A session read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub path: PathBuf,
    pub file: SessionFile,
    pub compressed: bool,
}

/// Summary of a successful save.
#[derive(Debug, Clone)]
pub struct SavedSession {
    pub path: PathBuf,
    pub session_id: String,
    pub bytes: usize,
    pub compressed: bool,
    pub evicted: usize,
}

/// Writes the snapshot as a new session file and evicts files beyond the history limit.
///
/// The file is written to a temporary path and renamed into place while an
/// exclusive lock is held, so readers never observe a partial session.
pub fn save_session(snapshot: &CanvasSnapshot, options: &SessionOptions) -> Result<SavedSession> {
    fs::create_dir_all(&options.base_dir).with_context(|| {
        format!(
            "failed to create session directory {}",
            options.base_dir.display()
        )
    })?;

    let lock_path = options.lock_file_path();
    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("failed to open session lock file {}", lock_path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| format!("failed to lock session file {}", lock_path.display()))?;

    let result = save_session_inner(snapshot, options);

    lock_file.unlock().unwrap_or_else(|err| {
        warn!(
            "failed to unlock session file {}: {}",
            lock_path.display(),
            err
        )
    });

    result
}

fn save_session_inner(snapshot: &CanvasSnapshot, options: &SessionOptions) -> Result<SavedSession> {
    let now = Utc::now();
    let (session_id, session_path) = next_session_path(options, now);

    let mut canvas = snapshot.clone();
    if canvas.strokes.len() > options.max_strokes {
        warn!(
            "Canvas holds {} strokes which exceeds the session limit of {}; saving the oldest {}",
            canvas.strokes.len(),
            options.max_strokes,
            options.max_strokes
        );
        canvas.strokes.truncate(options.max_strokes);
    }

    let file_payload = SessionFile {
        version: CURRENT_VERSION,
        session_id: session_id.clone(),
        saved_at: now.to_rfc3339(),
        canvas,
    };

    let mut json_bytes =
        serde_json::to_vec(&file_payload).context("failed to serialise session payload")?;

    if json_bytes.len() as u64 > options.max_file_size_bytes {
        bail!(
            "session data size {} bytes exceeds the configured limit of {} bytes",
            json_bytes.len(),
            options.max_file_size_bytes
        );
    }

    let should_compress = match options.compression {
        CompressionMode::Off => false,
        CompressionMode::On => true,
        CompressionMode::Auto => (json_bytes.len() as u64) >= options.auto_compress_threshold_bytes,
    };

    if should_compress {
        json_bytes = compress_bytes(&json_bytes)?;
    }

    let tmp_path = temp_path(&session_path);
    {
        let mut tmp_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .with_context(|| {
                format!(
                    "failed to open temporary session file {}",
                    tmp_path.display()
                )
            })?;
        tmp_file
            .write_all(&json_bytes)
            .context("failed to write session payload")?;
        tmp_file
            .sync_all()
            .context("failed to sync temporary session file")?;
    }

    fs::rename(&tmp_path, &session_path).with_context(|| {
        format!(
            "failed to move temporary session file {} -> {}",
            tmp_path.display(),
            session_path.display()
        )
    })?;

    let evicted = storage::evict_old_sessions(options)?;

    info!(
        "Session saved to {} ({} strokes, {} bytes, compression={})",
        session_path.display(),
        file_payload.canvas.strokes.len(),
        json_bytes.len(),
        should_compress
    );

    Ok(SavedSession {
        path: session_path,
        session_id,
        bytes: json_bytes.len(),
        compressed: should_compress,
        evicted,
    })
}

/// Reads and validates one session file.
///
/// Truncated gzip streams, malformed JSON, oversize files and unknown format
/// versions are reported as errors.
pub fn load_session(path: &Path, options: &SessionOptions) -> Result<LoadedSession> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to stat session file {}", path.display()))?;
    if metadata.len() > options.max_file_size_bytes {
        bail!(
            "session file {} is {} bytes which exceeds the configured limit ({} bytes)",
            path.display(),
            metadata.len(),
            options.max_file_size_bytes
        );
    }

    let mut file_bytes = Vec::new();
    {
        let mut file = File::open(path)
            .with_context(|| format!("failed to open session file {}", path.display()))?;
        file.read_to_end(&mut file_bytes)
            .context("failed to read session file")?;
    }

    let compressed = is_gzip(&file_bytes);
    let decompressed = if compressed {
        let mut decoder = GzDecoder::new(&file_bytes[..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .context("failed to decompress session file")?;
        out
    } else {
        file_bytes
    };

    let mut session_file: SessionFile =
        serde_json::from_slice(&decompressed).context("failed to parse session json")?;

    if session_file.version == 0 || session_file.version > CURRENT_VERSION {
        bail!(
            "session file {} has unsupported version {}",
            path.display(),
            session_file.version
        );
    }

    if session_file.canvas.strokes.len() > options.max_strokes {
        warn!(
            "Session {} contains {} strokes which exceeds the limit of {}; truncating",
            session_file.session_id,
            session_file.canvas.strokes.len(),
            options.max_strokes
        );
        session_file.canvas.strokes.truncate(options.max_strokes);
    }

    Ok(LoadedSession {
        path: path.to_path_buf(),
        file: session_file,
        compressed,
    })
}

/// Returns the newest session that loads cleanly, skipping corrupt files.
pub fn latest_session(options: &SessionOptions) -> Result<Option<LoadedSession>> {
    let lock_path = options.lock_file_path();
    if !options.base_dir.exists() {
        debug!(
            "No session directory at {}, nothing to recover",
            options.base_dir.display()
        );
        return Ok(None);
    }

    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("failed to open session lock file {}", lock_path.display()))?;
    lock_file
        .lock_shared()
        .with_context(|| format!("failed to acquire shared lock {}", lock_path.display()))?;

    let mut found = None;
    for path in storage::list_session_files(&options.base_dir)?.into_iter().rev() {
        match load_session(&path, options) {
            Ok(loaded) => {
                found = Some(loaded);
                break;
            }
            Err(err) => warn!("Skipping unreadable session {}: {:#}", path.display(), err),
        }
    }

    lock_file.unlock().unwrap_or_else(|err| {
        warn!(
            "failed to unlock session file {}: {}",
            lock_path.display(),
            err
        )
    });

    Ok(found)
}

fn next_session_path(options: &SessionOptions, now: DateTime<Utc>) -> (String, PathBuf) {
    let stamp = now.format("%Y%m%dT%H%M%S%3fZ");
    let mut seq = 0u32;
    loop {
        let id = format!("{}-{:03}", stamp, seq);
        let path = options.session_file_path(&id);
        if !path.exists() {
            return (id, path);
        }
        seq += 1;
    }
}

fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .context("failed to compress session payload")?;
    encoder
        .finish()
        .context("failed to finalise compressed session payload")
}

pub(crate) fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

fn temp_path(target: &Path) -> PathBuf {
    let mut candidate = target.with_extension("json.tmp");
    let mut counter = 0u32;
    while candidate.exists() {
        counter += 1;
        candidate = target.with_extension(format!("json.tmp{}", counter));
    }
    candidate
}
