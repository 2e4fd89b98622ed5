//! Session persistence: periodic autosave, bounded history and crash recovery.
//!
//! Each save writes a new self-contained session file next to older ones, with
//! locking and optional gzip compression. A run marker left behind by a crash
//! makes the next start offer the newest loadable session for recovery.

mod manager;
mod options;
mod snapshot;
mod storage;

pub use manager::{SessionManager, SessionStatus, recovery_candidate};
pub use options::{
    CompressionMode, DEFAULT_AUTO_COMPRESS_THRESHOLD_BYTES, SessionOptions, options_from_config,
};
pub use snapshot::{
    LoadedSession, SavedSession, SessionFile, latest_session, load_session, save_session,
};
pub use storage::{
    ClearOutcome, RunMarker, SessionFileInfo, SessionInspection, clear_sessions, inspect_sessions,
    list_session_files,
};

#[cfg(test)]
mod tests;
