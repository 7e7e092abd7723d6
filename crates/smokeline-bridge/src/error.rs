//! Bridge errors

use smokeline_core::{CloudError, IngestError, SmokelineError};

/// An inbound local payload that could not be decoded into a reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed reading: {reason}")]
pub struct MalformedReadingError {
    /// Decoder message
    pub reason: String,
    /// The payload as received
    pub payload: String,
}

/// Bridge errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// Payload dropped before reaching the batch or the live channel
    #[error(transparent)]
    MalformedReading(#[from] MalformedReadingError),

    /// Batch write failed after every retry; the batch is kept
    #[error("Durable write failed after {attempts} attempts: {last_error}")]
    DurableWrite {
        /// Attempts made, including the first
        attempts: u32,
        /// Error from the final attempt
        last_error: String,
    },

    /// Cloud channel failure
    #[error(transparent)]
    Channel(#[from] CloudError),

    /// Durable API failure outside a batch write
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Adapter could not be constructed from configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<BridgeError> for SmokelineError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::MalformedReading(malformed) => {
                SmokelineError::invalid(malformed.to_string())
            }
            BridgeError::DurableWrite { .. } => SmokelineError::storage(err.to_string()),
            BridgeError::Channel(channel) => channel.into(),
            BridgeError::Ingest(ingest) => ingest.into(),
            BridgeError::Config(message) => SmokelineError::config(message),
        }
    }
}
