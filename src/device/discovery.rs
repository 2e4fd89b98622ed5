//! Serial port enumeration on Linux.
//!
//! Ports are found through the stable `/dev/serial/by-id` links, whose names
//! carry the USB vendor and product strings, plus the raw `ttyUSB*` and
//! `ttyACM*` nodes described by their kernel driver from sysfs.

use std::fs;
use std::path::{Path, PathBuf};

/// A serial endpoint and the text identifiers are matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub path: PathBuf,
    pub description: String,
}

impl PortInfo {
    pub fn new(path: impl Into<PathBuf>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }

    /// Case-insensitive match of `identifier` against the path and description.
    pub fn matches(&self, identifier: &str) -> bool {
        let needle = identifier.to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.description.to_lowercase().contains(&needle)
            || self.path.to_string_lossy().to_lowercase().contains(&needle)
    }
}

/// Source of candidate serial ports.
pub trait PortEnumerator: Send + Sync {
    fn ports(&self) -> Vec<PortInfo>;
}

/// Enumerates ports from `/dev` and `/sys/class/tty`.
#[derive(Debug, Clone)]
pub struct SysfsEnumerator {
    dev_dir: PathBuf,
    sys_tty_dir: PathBuf,
}

impl Default for SysfsEnumerator {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
            sys_tty_dir: PathBuf::from("/sys/class/tty"),
        }
    }
}

impl SysfsEnumerator {
    pub fn with_roots(dev_dir: impl Into<PathBuf>, sys_tty_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            sys_tty_dir: sys_tty_dir.into(),
        }
    }

    fn by_id_ports(&self) -> Vec<PortInfo> {
        let by_id = self.dev_dir.join("serial").join("by-id");
        let Ok(entries) = fs::read_dir(&by_id) else {
            return Vec::new();
        };

        let mut ports = Vec::new();
        for entry in entries.flatten() {
            let link = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let target = fs::canonicalize(&link).unwrap_or(link);
            ports.push(PortInfo::new(target, name));
        }
        ports
    }

    fn tty_ports(&self) -> Vec<PortInfo> {
        let Ok(entries) = fs::read_dir(&self.dev_dir) else {
            return Vec::new();
        };

        let mut ports = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !(name.starts_with("ttyUSB") || name.starts_with("ttyACM")) {
                continue;
            }
            let mut description = name.clone();
            for detail in self.sysfs_details(&name) {
                description.push(' ');
                description.push_str(&detail);
            }
            let path = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path());
            ports.push(PortInfo::new(path, description));
        }
        ports
    }

    /// Driver name plus USB manufacturer/product strings when sysfs has them.
    fn sysfs_details(&self, tty: &str) -> Vec<String> {
        let device = self.sys_tty_dir.join(tty).join("device");
        let mut details = Vec::new();

        if let Some(driver) = link_name(&device.join("driver")) {
            details.push(driver);
        }
        // ttyACM devices sit on the interface; ttyUSB on a port below it
        for usb_device in [device.join(".."), device.join("..").join("..")] {
            for attr in ["manufacturer", "product"] {
                if let Ok(value) = fs::read_to_string(usb_device.join(attr)) {
                    let value = value.trim();
                    if !value.is_empty() {
                        details.push(value.to_string());
                    }
                }
            }
        }
        details
    }
}

impl PortEnumerator for SysfsEnumerator {
    fn ports(&self) -> Vec<PortInfo> {
        let mut ports: Vec<PortInfo> = Vec::new();
        for port in self.by_id_ports().into_iter().chain(self.tty_ports()) {
            match ports.iter_mut().find(|known| known.path == port.path) {
                Some(known) => {
                    known.description.push(' ');
                    known.description.push_str(&port.description);
                }
                None => ports.push(port),
            }
        }
        ports.sort_by(|a, b| a.path.cmp(&b.path));
        ports
    }
}

fn link_name(path: &Path) -> Option<String> {
    let target = fs::read_link(path).ok()?;
    target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

/// Ports whose description matches any identifier, in enumeration order.
pub fn matching_ports(ports: &[PortInfo], identifiers: &[String]) -> Vec<PortInfo> {
    ports
        .iter()
        .filter(|port| identifiers.iter().any(|id| port.matches(id)))
        .cloned()
        .collect()
}
