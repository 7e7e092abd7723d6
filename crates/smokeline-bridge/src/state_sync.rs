//! StateSync
//!
//! The only writer of the cooking flag is [`StateSync::toggle`]: it flips the
//! flag through the durable API and broadcasts the result as `smokeUpdate`.
//! Inbound broadcasts only update local caches.

use smokeline_core::{
    Clock, CloudChannel, CloudEvent, DurableIngest, ProbeNames, SmokeUpdate, SmokingState,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::mirror::{HistoryCache, SessionMirror};

/// Cooking flag synchronisation and history invalidation.
pub struct StateSync<C, D> {
    cloud: C,
    ingest: D,
    clock: Arc<dyn Clock>,
    mirror: SessionMirror,
    history: HistoryCache,
}

impl<C, D> StateSync<C, D>
where
    C: CloudChannel,
    D: DurableIngest,
{
    /// Create a state sync over shared caches.
    pub fn new(
        cloud: C,
        ingest: D,
        clock: Arc<dyn Clock>,
        mirror: SessionMirror,
        history: HistoryCache,
    ) -> Self {
        Self {
            cloud,
            ingest,
            clock,
            mirror,
            history,
        }
    }

    /// Session mirror updated by this instance.
    pub fn mirror(&self) -> &SessionMirror {
        &self.mirror
    }

    /// History cache maintained by this instance.
    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    /// Load the session flag, probe labels and history from the durable API.
    ///
    /// Each piece is optional: failures are logged and leave the defaults.
    pub async fn bootstrap(&self) {
        match self.ingest.session().await {
            Ok(session) => self.mirror.set_session(&session),
            Err(err) => warn!(error = %err, "Failed to load cooking session"),
        }
        self.mirror.set_names(self.probe_names().await);
        if let Err(err) = self.on_refresh().await {
            warn!(error = %err, "Failed to load reading history");
        }
        let state = self.mirror.state();
        info!(
            session = %state.session_id,
            smoking = state.smoking,
            history = self.history.len(),
            "State sync bootstrapped"
        );
    }

    /// Flip the cooking flag and broadcast the new value.
    ///
    /// The broadcast is fire-and-forget: an emit failure is logged and the
    /// durable toggle still counts.
    pub async fn toggle(&self) -> Result<SmokingState, BridgeError> {
        let session = self.ingest.toggle_smoking().await?;
        self.mirror.set_session(&session);

        let names = self.probe_names().await;
        self.mirror.set_names(names.clone());

        let update = SmokeUpdate::new(session.smoking, names);
        if let Err(err) = self.cloud.emit(CloudEvent::SmokeUpdate(update)).await {
            warn!(error = %err, smoking = session.smoking, "smokeUpdate broadcast failed");
        }
        info!(smoking = session.smoking, "Cooking flag toggled");
        Ok(session.state())
    }

    /// Apply an inbound `smokeUpdate`.
    pub fn on_smoke_update(&self, update: &SmokeUpdate) {
        debug!(smoking = update.smoking, "smokeUpdate received");
        self.mirror.apply(update);
    }

    /// Drop cached history. Durable data is untouched.
    pub fn on_clear(&self) {
        info!(dropped = self.history.len(), "History cleared");
        self.history.clear();
    }

    /// Re-fetch cached history from the durable API.
    pub async fn on_refresh(&self) -> Result<usize, BridgeError> {
        let records = self.ingest.current_history().await?;
        let now = self.clock.now();
        self.history
            .replace(records.iter().map(|record| record.to_reading(now)));
        debug!(count = records.len(), "History refreshed");
        Ok(records.len())
    }

    /// Dispatch one inbound event.
    pub async fn handle_event(&self, event: &CloudEvent) {
        match event {
            CloudEvent::SmokeUpdate(update) => self.on_smoke_update(update),
            CloudEvent::Clear => self.on_clear(),
            CloudEvent::Refresh => {
                if let Err(err) = self.on_refresh().await {
                    warn!(error = %err, "History refresh failed");
                }
            }
            CloudEvent::Live(_) => {}
        }
    }

    /// Handle inbound events until the channel closes or `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.cloud.subscribe();
        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(&event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Missed cloud events, reloading history");
                        if let Err(err) = self.on_refresh().await {
                            warn!(error = %err, "History refresh failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("State sync stopped");
    }

    async fn probe_names(&self) -> ProbeNames {
        match self.ingest.current_probe_names().await {
            Ok(names) => names,
            Err(err) => {
                debug!(error = %err, "No smoke profile, using current probe labels");
                self.mirror.state().names
            }
        }
    }
}

impl<C, D> std::fmt::Debug for StateSync<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSync")
            .field("mirror", &self.mirror.state())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}
