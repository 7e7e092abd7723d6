//! Durable ingest effect
//!
//! The HTTP collaborator that persists readings and owns the cooking session
//! record. Paths are relative to a configured base URL:
//!
//! - `POST temps/batch`
//! - `GET temps`, `GET temps/{id}`
//! - `PUT state/toggleSmoking`, `GET state`
//! - `GET smokeProfile/current`

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::SmokelineError;
use crate::session::{CookingSession, ProbeNames};
use crate::wire::TempRecord;

/// Durable ingest errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// The request never produced a response
    #[error("Transport failure: {reason}")]
    Transport {
        /// Reason for the failure
        reason: String,
    },
    /// The backend answered with a non-success status
    #[error("{endpoint} returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Endpoint path
        endpoint: String,
    },
    /// The response body could not be decoded
    #[error("Failed to decode response: {reason}")]
    Decode {
        /// Decoder message
        reason: String,
    },
    /// The backend is deliberately unavailable (test handlers)
    #[error("Durable ingest unavailable")]
    Unavailable,
}

impl From<IngestError> for SmokelineError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Decode { reason } => SmokelineError::serialization(reason),
            IngestError::Status { status: 404, endpoint } => SmokelineError::not_found(endpoint),
            other => SmokelineError::storage(other.to_string()),
        }
    }
}

/// Durable store for readings and the cooking session.
#[async_trait]
pub trait DurableIngest: Send + Sync {
    /// Persist a batch of readings in order.
    async fn post_batch(&self, records: &[TempRecord]) -> Result<(), IngestError>;

    /// Readings of the current session.
    async fn current_history(&self) -> Result<Vec<TempRecord>, IngestError>;

    /// Readings of a specific temperature series.
    async fn history_by_id(&self, id: &str) -> Result<Vec<TempRecord>, IngestError>;

    /// Flip the cooking flag and return the new session record.
    async fn toggle_smoking(&self) -> Result<CookingSession, IngestError>;

    /// Current session record.
    async fn session(&self) -> Result<CookingSession, IngestError>;

    /// Probe labels of the current smoke profile.
    async fn current_probe_names(&self) -> Result<ProbeNames, IngestError>;
}

/// Blanket implementation for Arc<T> where T: DurableIngest
#[async_trait]
impl<T: DurableIngest + ?Sized> DurableIngest for Arc<T> {
    async fn post_batch(&self, records: &[TempRecord]) -> Result<(), IngestError> {
        (**self).post_batch(records).await
    }

    async fn current_history(&self) -> Result<Vec<TempRecord>, IngestError> {
        (**self).current_history().await
    }

    async fn history_by_id(&self, id: &str) -> Result<Vec<TempRecord>, IngestError> {
        (**self).history_by_id(id).await
    }

    async fn toggle_smoking(&self) -> Result<CookingSession, IngestError> {
        (**self).toggle_smoking().await
    }

    async fn session(&self) -> Result<CookingSession, IngestError> {
        (**self).session().await
    }

    async fn current_probe_names(&self) -> Result<ProbeNames, IngestError> {
        (**self).current_probe_names().await
    }
}
