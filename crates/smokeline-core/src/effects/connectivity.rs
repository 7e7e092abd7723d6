//! Physical network indicator
//!
//! Distinct from the cloud channel's own link state: this only drives the
//! status icon shown to the operator and never influences whether a reading
//! is streamed or buffered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Last observed network status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    /// The last check reached the network
    Online,
    /// The last check failed
    Offline,
    /// No check has completed yet
    #[default]
    Unknown,
}

impl From<bool> for NetworkStatus {
    fn from(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// One-shot physical connectivity check.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the network is reachable right now.
    async fn is_online(&self) -> bool;
}

/// Blanket implementation for Arc<T> where T: ConnectivityProbe
#[async_trait]
impl<T: ConnectivityProbe + ?Sized> ConnectivityProbe for Arc<T> {
    async fn is_online(&self) -> bool {
        (**self).is_online().await
    }
}
