use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

use super::options::SessionOptions;
use super::snapshot::{self, LoadedSession, SavedSession};
use super::storage::RunMarker;
use crate::draw::{CanvasSnapshot, CanvasState};

/// Status of the most recent persistence attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Saving,
    Saved { session_id: String, at: DateTime<Utc> },
    Failed(String),
}

enum SessionRequest {
    SaveNow,
    Shutdown(oneshot::Sender<()>),
}

/// Background autosave for the canvas.
///
/// The frame loop publishes snapshots through a watch channel; the manager task
/// persists the newest one on every interval tick when its revision changed.
/// File I/O runs on tokio's blocking pool.
pub struct SessionManager {
    snapshot_tx: watch::Sender<Arc<CanvasSnapshot>>,
    request_tx: mpsc::UnboundedSender<SessionRequest>,
    status: Arc<Mutex<SessionStatus>>,
    published_revision: u64,
    marker: Option<RunMarker>,
}

impl SessionManager {
    /// Spawn the autosave task. `canvas` is the starting state and is not saved
    /// until it changes.
    pub fn start(
        runtime_handle: &tokio::runtime::Handle,
        options: SessionOptions,
        marker: Option<RunMarker>,
        canvas: &CanvasState,
    ) -> Self {
        let initial = Arc::new(canvas.snapshot());
        let published_revision = initial.revision;
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let status = Arc::new(Mutex::new(SessionStatus::Idle));

        runtime_handle.spawn(run_autosave(
            options,
            snapshot_rx,
            request_rx,
            status.clone(),
            published_revision,
        ));

        Self {
            snapshot_tx,
            request_tx,
            status,
            published_revision,
            marker,
        }
    }

    /// Hands the current canvas to the autosave task if it changed since the last call.
    pub fn publish(&mut self, canvas: &CanvasState) -> bool {
        if canvas.revision() == self.published_revision {
            return false;
        }
        self.published_revision = canvas.revision();
        self.snapshot_tx.send_replace(Arc::new(canvas.snapshot()));
        true
    }

    /// Persist the latest published snapshot now, regardless of the interval.
    pub fn request_save(&self) -> Result<()> {
        self.request_tx
            .send(SessionRequest::SaveNow)
            .map_err(|_| anyhow!("session manager not running"))
    }

    /// Try to read the status without waiting (non-blocking).
    pub fn try_status(&self) -> Option<SessionStatus> {
        self.status.try_lock().ok().map(|s| s.clone())
    }

    pub async fn status(&self) -> SessionStatus {
        self.status.lock().await.clone()
    }

    /// Flush pending changes, stop the task and remove the run marker.
    ///
    /// Waits at most `timeout` for the final save. The marker is removed even
    /// when the save did not finish, since the process is exiting cleanly.
    pub async fn shutdown(self, timeout: Duration) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .request_tx
            .send(SessionRequest::Shutdown(done_tx))
            .is_ok()
        {
            // A dropped sender means the task already exited.
            if tokio::time::timeout(timeout, done_rx).await.is_err() {
                log::warn!("Final session save did not finish within {:?}", timeout);
            }
        }
        if let Some(marker) = self.marker {
            marker.release()?;
        }
        Ok(())
    }
}

async fn run_autosave(
    options: SessionOptions,
    snapshot_rx: watch::Receiver<Arc<CanvasSnapshot>>,
    mut request_rx: mpsc::UnboundedReceiver<SessionRequest>,
    status: Arc<Mutex<SessionStatus>>,
    initial_revision: u64,
) {
    let period = options.autosave_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut saved_revision = initial_revision;

    log::debug!(
        "Autosave every {:?} into {}",
        period,
        options.base_dir.display()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                persist(&options, &snapshot_rx, &status, &mut saved_revision, false).await;
            }
            request = request_rx.recv() => match request {
                Some(SessionRequest::SaveNow) => {
                    persist(&options, &snapshot_rx, &status, &mut saved_revision, true).await;
                }
                Some(SessionRequest::Shutdown(done)) => {
                    persist(&options, &snapshot_rx, &status, &mut saved_revision, false).await;
                    let _ = done.send(());
                    break;
                }
                None => break,
            },
        }
    }
    log::debug!("Autosave task stopped");
}

async fn persist(
    options: &SessionOptions,
    snapshot_rx: &watch::Receiver<Arc<CanvasSnapshot>>,
    status: &Arc<Mutex<SessionStatus>>,
    saved_revision: &mut u64,
    force: bool,
) {
    let latest = snapshot_rx.borrow().clone();
    if !force && latest.revision == *saved_revision {
        return;
    }

    *status.lock().await = SessionStatus::Saving;
    let revision = latest.revision;
    let job_options = options.clone();
    let result = tokio::task::spawn_blocking(move || snapshot::save_session(&latest, &job_options))
        .await
        .map_err(|err| anyhow!("session save task panicked: {}", err))
        .and_then(|inner| inner);

    match result {
        Ok(SavedSession { session_id, .. }) => {
            *saved_revision = revision;
            *status.lock().await = SessionStatus::Saved {
                session_id,
                at: Utc::now(),
            };
        }
        Err(err) => {
            // saved_revision stays behind so the next tick retries
            log::error!("Autosave failed: {:#}", err);
            *status.lock().await = SessionStatus::Failed(format!("{:#}", err));
        }
    }
}

/// Returns the session to restore when the previous run did not shut down cleanly.
pub fn recovery_candidate(
    options: &SessionOptions,
    marker: &RunMarker,
) -> Result<Option<LoadedSession>> {
    if !marker.previous_run_unclean() {
        return Ok(None);
    }
    let candidate = snapshot::latest_session(options)?;
    match &candidate {
        Some(loaded) => log::info!(
            "Recovering {} strokes from {}",
            loaded.file.canvas.strokes.len(),
            loaded.path.display()
        ),
        None => log::info!("No loadable session to recover"),
    }
    Ok(candidate)
}
