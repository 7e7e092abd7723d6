//! Cloud channel effect
//!
//! The cloud channel is a bidirectional event stream shared by every bridge
//! attached to the same backend. Its link state is observable through a
//! `watch` receiver so callers can react to the Disconnected → Connected edge
//! instead of polling a flag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::errors::SmokelineError;
use crate::events::CloudEvent;

/// Observed state of the cloud channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Events can be emitted
    Connected,
    /// Events cannot be emitted
    #[default]
    Disconnected,
}

impl LinkState {
    /// Shorthand for `== Connected`.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Cloud channel errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloudError {
    /// The channel is not connected
    #[error("Cloud channel not connected")]
    NotConnected,
    /// The frame could not be handed to the transport
    #[error("Failed to send event: {reason}")]
    SendFailed {
        /// Reason for the failure
        reason: String,
    },
    /// Establishing the connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// The event could not be encoded
    #[error("Encoding failed: {error}")]
    Encoding {
        /// Encoder message
        error: String,
    },
}

impl From<SmokelineError> for CloudError {
    fn from(err: SmokelineError) -> Self {
        Self::Encoding {
            error: err.to_string(),
        }
    }
}

impl From<CloudError> for SmokelineError {
    fn from(err: CloudError) -> Self {
        SmokelineError::network(err.to_string())
    }
}

/// Bidirectional event stream to the cloud backend.
#[async_trait]
pub trait CloudChannel: Send + Sync {
    /// Receiver tracking the link state; the current value is always readable.
    fn link_state(&self) -> watch::Receiver<LinkState>;

    /// Whether the channel is connected right now.
    fn is_connected(&self) -> bool {
        self.link_state().borrow().is_connected()
    }

    /// Emit one event. `Ok` means the frame reached the transport; receivers
    /// never acknowledge.
    async fn emit(&self, event: CloudEvent) -> Result<(), CloudError>;

    /// Subscribe to events broadcast by the backend.
    fn subscribe(&self) -> broadcast::Receiver<CloudEvent>;
}

/// Blanket implementation for Arc<T> where T: CloudChannel
#[async_trait]
impl<T: CloudChannel + ?Sized> CloudChannel for Arc<T> {
    fn link_state(&self) -> watch::Receiver<LinkState> {
        (**self).link_state()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn emit(&self, event: CloudEvent) -> Result<(), CloudError> {
        (**self).emit(event).await
    }

    fn subscribe(&self) -> broadcast::Receiver<CloudEvent> {
        (**self).subscribe()
    }
}
