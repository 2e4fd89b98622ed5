//! Raw serial transport on top of termios.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::time::{Duration, Instant};

use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg, SpecialCharacterIndices};

use super::discovery::PortInfo;
use super::error::DeviceError;

/// An open, line-oriented serial connection.
pub trait SerialLink: Send {
    /// Write `line` followed by a newline.
    fn write_line(&mut self, line: &str) -> Result<(), DeviceError>;

    /// Read one line, or `None` when nothing arrived before `timeout`.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, DeviceError>;
}

/// Opens serial links.
pub trait SerialConnector: Send + Sync {
    fn open(&self, port: &PortInfo, baud_rate: u32) -> Result<Box<dyn SerialLink>, DeviceError>;
}

/// Opens `/dev/tty*` nodes in raw mode via termios.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermiosConnector;

impl SerialConnector for TermiosConnector {
    fn open(&self, port: &PortInfo, baud_rate: u32) -> Result<Box<dyn SerialLink>, DeviceError> {
        Ok(Box::new(TermiosLink::open(port, baud_rate)?))
    }
}

pub struct TermiosLink {
    file: File,
    pending: Vec<u8>,
}

impl TermiosLink {
    pub fn open(port: &PortInfo, baud_rate: u32) -> Result<Self, DeviceError> {
        let speed = baud_rate_for(baud_rate)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&port.path)
            .map_err(|source| DeviceError::Open {
                port: port.path.display().to_string(),
                source,
            })?;

        let mut settings = termios::tcgetattr(file.as_fd())?;
        termios::cfmakeraw(&mut settings);
        termios::cfsetspeed(&mut settings, speed)?;
        settings.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        // Reads return after 100 ms without data
        settings.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        settings.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;
        termios::tcsetattr(file.as_fd(), SetArg::TCSANOW, &settings)?;
        termios::tcflush(file.as_fd(), FlushArg::TCIOFLUSH)?;

        log::debug!("Opened {} at {} baud", port.path.display(), baud_rate);
        Ok(Self {
            file,
            pending: Vec::new(),
        })
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(
            String::from_utf8_lossy(&line)
                .trim_end_matches(['\r', '\n'])
                .to_string(),
        )
    }
}

impl SerialLink for TermiosLink {
    fn write_line(&mut self, line: &str) -> Result<(), DeviceError> {
        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
        self.file.write_all(&payload)?;
        self.file.flush()?;
        termios::tcdrain(self.file.as_fd())?;
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, DeviceError> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            match self.file.read(&mut chunk) {
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn baud_rate_for(rate: u32) -> Result<BaudRate, DeviceError> {
    let speed = match rate {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => return Err(DeviceError::UnsupportedBaud(other)),
    };
    Ok(speed)
}
