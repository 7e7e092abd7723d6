//! Network status indicator
//!
//! Fed by the bridge on every reading. At most one probe runs at a time; a
//! reading that arrives while a probe is in flight does not start another.
//! The result is published for the status icon and nothing else.

use smokeline_core::{ConnectivityProbe, NetworkStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Asynchronous, non-blocking connectivity indicator.
#[derive(Clone)]
pub struct NetworkIndicator {
    probe: Arc<dyn ConnectivityProbe>,
    status: Arc<watch::Sender<NetworkStatus>>,
    in_flight: Arc<AtomicBool>,
}

impl NetworkIndicator {
    /// Indicator backed by `probe`, starting as [`NetworkStatus::Unknown`].
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        let (status, _) = watch::channel(NetworkStatus::Unknown);
        Self {
            probe,
            status: Arc::new(status),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a background check unless one is already running.
    pub fn check(&self) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return;
        }
        let indicator = self.clone();
        tokio::spawn(async move {
            let status = NetworkStatus::from(indicator.probe.is_online().await);
            let previous = indicator.status.send_replace(status);
            if previous != status {
                debug!(?status, "Network status changed");
            }
            indicator.in_flight.store(false, Ordering::Release);
        });
    }

    /// Last observed status.
    pub fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    /// Receiver notified when the status changes.
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

impl std::fmt::Debug for NetworkIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkIndicator")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
