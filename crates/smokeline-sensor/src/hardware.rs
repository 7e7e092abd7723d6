//! Serial probe interface
//!
//! The probe board writes one JSON object per line at 9600 baud. Lines are
//! assembled on a blocking reader thread and handed to the async side through
//! a bounded channel.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{SensorError, SensorReadError};

/// One decoded line, or the reason it could not be decoded.
pub type LineResult = Result<String, SensorReadError>;

const READ_TIMEOUT: Duration = Duration::from_millis(250);
const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into trimmed text lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every line they complete.
    ///
    /// Empty lines are skipped. Invalid UTF-8 and overlong lines come back as
    /// errors without disturbing the lines around them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<LineResult> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.buffer);
                if let Some(line) = Self::decode(raw) {
                    lines.push(line);
                }
            } else if self.buffer.len() >= MAX_LINE_LEN {
                self.buffer.clear();
                lines.push(Err(SensorReadError::new(
                    format!("line exceeds {MAX_LINE_LEN} bytes"),
                    None,
                )));
            } else {
                self.buffer.push(byte);
            }
        }
        lines
    }

    /// Bytes received since the last line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn decode(raw: Vec<u8>) -> Option<LineResult> {
        match String::from_utf8(raw) {
            Ok(text) => {
                let line = text.trim_end_matches('\r').trim();
                if line.is_empty() {
                    None
                } else {
                    Some(Ok(line.to_string()))
                }
            }
            Err(err) => {
                let lossy = String::from_utf8_lossy(err.as_bytes()).into_owned();
                Some(Err(SensorReadError::new(
                    format!("invalid UTF-8: {}", err.utf8_error()),
                    Some(lossy),
                )))
            }
        }
    }
}

/// Reads lines from a serial device on a blocking thread.
#[derive(Debug, Clone)]
pub struct SerialLineReader {
    path: String,
    baud_rate: u32,
}

impl SerialLineReader {
    /// Reader for `path` at `baud_rate`, 8N1 without flow control.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }

    /// Open the port and start forwarding lines into `lines`.
    ///
    /// The thread stops when the receiver is dropped or the port fails.
    pub fn spawn(&self, lines: mpsc::Sender<LineResult>) -> Result<JoinHandle<()>, SensorError> {
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| SensorError::serial(&self.path, e.to_string()))?;

        info!(path = %self.path, baud = self.baud_rate, "Serial port opened");
        let path = self.path.clone();
        Ok(tokio::task::spawn_blocking(move || read_lines(path, port, lines)))
    }
}

fn read_lines(path: String, mut port: Box<dyn SerialPort>, lines: mpsc::Sender<LineResult>) {
    let mut assembler = LineAssembler::new();
    let mut chunk = [0u8; 256];

    loop {
        match port.read(&mut chunk) {
            Ok(0) => continue,
            Ok(read) => {
                for line in assembler.push(&chunk[..read]) {
                    if lines.blocking_send(line).is_err() {
                        debug!(path = %path, "Line receiver dropped, closing serial reader");
                        return;
                    }
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                if lines.is_closed() {
                    return;
                }
            }
            Err(err) => {
                error!(path = %path, error = %err, "Serial read failed, stopping reader");
                return;
            }
        }
    }
}
