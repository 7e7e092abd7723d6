//! Sensor host errors

use smokeline_core::SmokelineError;

/// A single raw line that could not be decoded.
///
/// Never fatal: the source logs it and moves on to the next line or tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Sensor read failed: {reason}")]
pub struct SensorReadError {
    /// What went wrong
    pub reason: String,
    /// The offending payload, when one could be recovered
    pub payload: Option<String>,
}

impl SensorReadError {
    /// Create a read error for a payload.
    pub fn new(reason: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            payload,
        }
    }
}

/// Sensor host errors
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// A line could not be decoded
    #[error(transparent)]
    Read(#[from] SensorReadError),

    /// Socket or file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or read
    #[error("Serial port {path}: {reason}")]
    Serial {
        /// Device path
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// The local relay failed
    #[error("Relay error: {reason}")]
    Relay {
        /// Reason for the failure
        reason: String,
    },
}

impl SensorError {
    /// Create a serial port error
    pub fn serial(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Serial {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a relay error
    pub fn relay(reason: impl Into<String>) -> Self {
        Self::Relay {
            reason: reason.into(),
        }
    }
}

impl From<SensorError> for SmokelineError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::Read(read) => SmokelineError::invalid(read.to_string()),
            SensorError::Io(io) => SmokelineError::from(io),
            other => SmokelineError::network(other.to_string()),
        }
    }
}
