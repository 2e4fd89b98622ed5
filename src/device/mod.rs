//! Serial bridge to the robotic hand.
//!
//! The bridge discovers a matching serial port, keeps the link open on a
//! worker thread and forwards recognized text as newline-terminated commands.
//! When no device is present the rest of the pipeline keeps running.

mod bridge;
mod discovery;
mod error;
mod serial;

pub use bridge::{DeviceBridge, DeviceSettings, WORKER_STOP_TIMEOUT, candidate_ports};
pub use discovery::{PortEnumerator, PortInfo, SysfsEnumerator, matching_ports};
pub use error::DeviceError;
pub use serial::{SerialConnector, SerialLink, TermiosConnector, TermiosLink};
