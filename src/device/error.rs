use std::time::Duration;
use thiserror::Error;

/// Errors raised by the serial device bridge.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no robotic hand connected")]
    NotConnected,

    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terminal configuration failed: {0}")]
    Termios(#[from] nix::errno::Errno),

    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handshake with {port} failed: {reason}")]
    Handshake { port: String, reason: String },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    #[error("device bridge is not running")]
    WorkerStopped,
}
