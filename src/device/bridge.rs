use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc as std_mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use super::discovery::{PortEnumerator, PortInfo, SysfsEnumerator, matching_ports};
use super::error::DeviceError;
use super::serial::{SerialConnector, SerialLink, TermiosConnector};
use crate::config::DeviceConfig;

/// How long [`DeviceBridge::shutdown`] waits for the worker before detaching it.
pub const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection parameters for the robotic hand.
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub port: Option<String>,
    pub identifiers: Vec<String>,
    pub baud_rate: u32,
    pub handshake_timeout: Duration,
    pub settle: Duration,
    pub probe: Option<String>,
    pub expect: Option<String>,
    pub inter_command_delay: Duration,
}

impl DeviceSettings {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            port: config.port.clone(),
            identifiers: config.identifiers.clone(),
            baud_rate: config.baud_rate,
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
            settle: Duration::from_millis(config.settle_ms),
            probe: config.probe.clone(),
            expect: config.expect.clone(),
            inter_command_delay: Duration::from_millis(config.inter_command_delay_ms),
        }
    }
}

/// Ports the bridge would try, in order.
pub fn candidate_ports(settings: &DeviceSettings, enumerator: &dyn PortEnumerator) -> Vec<PortInfo> {
    match &settings.port {
        Some(port) => vec![PortInfo::new(port, "configured port")],
        None => matching_ports(&enumerator.ports(), &settings.identifiers),
    }
}

enum BridgeRequest {
    Send {
        command: String,
        reply: oneshot::Sender<Result<(), DeviceError>>,
    },
    Rediscover {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Serial link to the robotic hand, driven by a dedicated worker thread.
///
/// Commands are queued and written one at a time, newline-terminated, with a
/// pause between consecutive commands. A failed write marks the link stale and
/// the next command runs discovery again.
#[derive(Clone)]
pub struct DeviceBridge {
    request_tx: mpsc::UnboundedSender<BridgeRequest>,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    port: Arc<Mutex<Option<PortInfo>>>,
    worker: Arc<Mutex<Option<WorkerHandle>>>,
}

struct WorkerHandle {
    thread: JoinHandle<()>,
    done_rx: std_mpsc::Receiver<()>,
}

impl DeviceBridge {
    /// Start the worker with the system serial stack.
    pub fn start(settings: DeviceSettings) -> std::io::Result<Self> {
        Self::with_transport(
            settings,
            Arc::new(SysfsEnumerator::default()),
            Arc::new(TermiosConnector),
        )
    }

    /// Start the worker with custom port discovery and transport (useful for testing).
    ///
    /// Discovery runs on the worker, so the bridge reports disconnected until it completes.
    pub fn with_transport(
        settings: DeviceSettings,
        enumerator: Arc<dyn PortEnumerator>,
        connector: Arc<dyn SerialConnector>,
    ) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let stopping = Arc::new(AtomicBool::new(false));
        let port = Arc::new(Mutex::new(None));
        let (done_tx, done_rx) = std_mpsc::channel();

        let worker = Worker {
            settings,
            enumerator,
            connector,
            link: None,
            last_sent: None,
            connected: connected.clone(),
            stopping: stopping.clone(),
            port: port.clone(),
        };
        let worker_thread = thread::Builder::new()
            .name("device-bridge".to_string())
            .spawn(move || {
                worker.run(request_rx);
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            request_tx,
            connected,
            stopping,
            port,
            worker: Arc::new(Mutex::new(Some(WorkerHandle {
                thread: worker_thread,
                done_rx,
            }))),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn connected_port(&self) -> Option<PortInfo> {
        self.port.lock().ok().and_then(|port| port.clone())
    }

    /// Queue a command; the receiver resolves once it was written or failed.
    pub fn submit(&self, command: impl Into<String>) -> oneshot::Receiver<Result<(), DeviceError>> {
        let (reply, rx) = oneshot::channel();
        let request = BridgeRequest::Send {
            command: command.into(),
            reply,
        };
        // On a stopped worker the reply sender is dropped and the receiver errors.
        let _ = self.request_tx.send(request);
        rx
    }

    /// Send a command and wait for its result. Must not be called from async code.
    pub fn send(&self, command: impl Into<String>) -> Result<(), DeviceError> {
        self.submit(command)
            .blocking_recv()
            .unwrap_or(Err(DeviceError::WorkerStopped))
    }

    pub async fn send_async(&self, command: impl Into<String>) -> Result<(), DeviceError> {
        self.submit(command)
            .await
            .unwrap_or(Err(DeviceError::WorkerStopped))
    }

    /// Drop the current link and search for the device again. Returns whether it was found.
    pub fn rediscover(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .request_tx
            .send(BridgeRequest::Rediscover { reply })
            .is_err()
        {
            return false;
        }
        rx.blocking_recv().unwrap_or(false)
    }

    /// Stop the worker, waiting at most [`WORKER_STOP_TIMEOUT`].
    pub fn shutdown(&self) -> bool {
        self.shutdown_timeout(WORKER_STOP_TIMEOUT)
    }

    /// Stop the worker and wait up to `timeout` for it to close the port.
    ///
    /// Commands still queued are answered with [`DeviceError::WorkerStopped`].
    /// A worker stuck in discovery or a blocking write is detached. Returns
    /// whether it stopped in time.
    pub fn shutdown_timeout(&self, timeout: Duration) -> bool {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.request_tx.send(BridgeRequest::Shutdown);
        let Some(handle) = self.worker.lock().ok().and_then(|mut worker| worker.take()) else {
            return true;
        };

        match handle.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                if handle.thread.join().is_err() {
                    log::error!("Device bridge worker panicked");
                }
                true
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Device bridge worker still busy after {:?}; detaching it",
                    timeout
                );
                false
            }
        }
    }
}

struct Worker {
    settings: DeviceSettings,
    enumerator: Arc<dyn PortEnumerator>,
    connector: Arc<dyn SerialConnector>,
    link: Option<Box<dyn SerialLink>>,
    last_sent: Option<Instant>,
    connected: Arc<AtomicBool>,
    stopping: Arc<AtomicBool>,
    port: Arc<Mutex<Option<PortInfo>>>,
}

impl Worker {
    fn run(mut self, mut requests: mpsc::UnboundedReceiver<BridgeRequest>) {
        self.discover();
        while let Some(request) = requests.blocking_recv() {
            match request {
                BridgeRequest::Send { reply, .. } if self.stopping.load(Ordering::SeqCst) => {
                    let _ = reply.send(Err(DeviceError::WorkerStopped));
                }
                BridgeRequest::Send { command, reply } => {
                    let result = self.send(&command);
                    let _ = reply.send(result);
                }
                BridgeRequest::Rediscover { reply } => {
                    self.disconnect();
                    let _ = reply.send(self.discover());
                }
                BridgeRequest::Shutdown => break,
            }
        }
        self.disconnect();
        log::debug!("Device bridge stopped");
    }

    fn send(&mut self, command: &str) -> Result<(), DeviceError> {
        if self.link.is_none() && !self.discover() {
            return Err(DeviceError::NotConnected);
        }

        if let Some(last) = self.last_sent {
            let elapsed = last.elapsed();
            if elapsed < self.settings.inter_command_delay {
                thread::sleep(self.settings.inter_command_delay - elapsed);
            }
        }

        let link = self.link.as_mut().ok_or(DeviceError::NotConnected)?;
        match link.write_line(command) {
            Ok(()) => {
                self.last_sent = Some(Instant::now());
                log::info!("Sent to robotic hand: {}", command);
                Ok(())
            }
            Err(err) => {
                log::warn!("Write to robotic hand failed, marking link stale: {}", err);
                self.disconnect();
                Err(err)
            }
        }
    }

    fn discover(&mut self) -> bool {
        let candidates = candidate_ports(&self.settings, self.enumerator.as_ref());
        if candidates.is_empty() {
            log::info!("No robotic hand found; continuing without hardware");
        }

        for port in candidates {
            match self.connect(&port) {
                Ok(link) => {
                    log::info!(
                        "Robotic hand connected on {} ({})",
                        port.path.display(),
                        port.description
                    );
                    self.link = Some(link);
                    self.last_sent = None;
                    self.connected.store(true, Ordering::SeqCst);
                    if let Ok(mut current) = self.port.lock() {
                        *current = Some(port);
                    }
                    return true;
                }
                Err(err) => log::warn!("Skipping {}: {}", port.path.display(), err),
            }
        }
        false
    }

    fn connect(&self, port: &PortInfo) -> Result<Box<dyn SerialLink>, DeviceError> {
        let mut link = self.connector.open(port, self.settings.baud_rate)?;
        if !self.settings.settle.is_zero() {
            thread::sleep(self.settings.settle);
        }

        let Some(probe) = &self.settings.probe else {
            return Ok(link);
        };
        link.write_line(probe)?;
        let reply = link
            .read_line(self.settings.handshake_timeout)?
            .ok_or(DeviceError::Timeout(self.settings.handshake_timeout))?;
        if let Some(expect) = &self.settings.expect
            && !reply.contains(expect.as_str())
        {
            return Err(DeviceError::Handshake {
                port: port.path.display().to_string(),
                reason: format!("unexpected reply {:?}", reply),
            });
        }
        Ok(link)
    }

    fn disconnect(&mut self) {
        self.link = None;
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut current) = self.port.lock() {
            *current = None;
        }
    }
}
