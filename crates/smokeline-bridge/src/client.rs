//! BridgeClient
//!
//! Decides, per reading, whether to stream it live or keep it for later:
//!
//! ```text
//!              link Connected                      link Disconnected
//!   STREAMING ─────────────────── reading ─────────────────── BUFFERING
//!     │ batch non-empty? flush ──► "refresh"          │ count; every Nth ──► Batch
//!     └ emit "events"                                 └ (others are skipped)
//! ```
//!
//! The client also flushes proactively on the Disconnected → Connected edge
//! of the cloud link. A flush runs to completion before the next reading is
//! taken from the inbound queue, so the batch never has two writers. The
//! batch is cleared only after the durable write succeeds; when every retry
//! fails the batch is kept and the next trigger tries again.
//!
//! Unflushed readings are lost if the process exits.

use serde::{Deserialize, Serialize};
use smokeline_core::{
    BridgeConfig, Clock, CloudChannel, CloudEvent, DurableIngest, LinkState, LiveState,
    LocalTemps, Reading, RetryPolicy,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::batch::{Batch, Decimator};
use crate::error::{BridgeError, MalformedReadingError};
use crate::indicator::NetworkIndicator;
use crate::mirror::{HistoryCache, SessionMirror};

/// Which path readings currently take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BridgeMode {
    /// Cloud channel connected: readings go live
    Streaming,
    /// Cloud channel down: readings are decimated into the batch
    Buffering,
}

impl From<LinkState> for BridgeMode {
    fn from(state: LinkState) -> Self {
        match state {
            LinkState::Connected => Self::Streaming,
            LinkState::Disconnected => Self::Buffering,
        }
    }
}

/// What happened to one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Emitted on the live channel
    Streamed,
    /// Appended to the batch
    Buffered,
    /// Counted by the decimator and dropped
    Skipped,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Readings emitted live
    pub forwarded: u64,
    /// Readings appended to the batch
    pub buffered: u64,
    /// Offline readings skipped by decimation
    pub decimated_out: u64,
    /// Payloads dropped as malformed
    pub malformed: u64,
    /// Successful batch writes
    pub flushes: u64,
    /// Batch writes that failed after every retry
    pub flush_failures: u64,
    /// Buffered readings evicted because the batch was full
    pub evicted: u64,
}

/// Live-or-buffer decision maker for one display client.
pub struct BridgeClient<C, D> {
    cloud: C,
    ingest: D,
    clock: Arc<dyn Clock>,
    batch: Batch,
    decimator: Decimator,
    flush_retry: RetryPolicy,
    mirror: SessionMirror,
    history: HistoryCache,
    indicator: Option<NetworkIndicator>,
    stats: watch::Sender<BridgeStats>,
}

impl<C, D> BridgeClient<C, D>
where
    C: CloudChannel,
    D: DurableIngest,
{
    /// Create a client with its own caches.
    pub fn new(cloud: C, ingest: D, clock: Arc<dyn Clock>, config: &BridgeConfig) -> Self {
        let (stats, _) = watch::channel(BridgeStats::default());
        Self {
            cloud,
            ingest,
            clock,
            batch: Batch::new(config.max_buffered),
            decimator: Decimator::new(config.decimation_threshold),
            flush_retry: config.flush_retry.clone(),
            mirror: SessionMirror::new(),
            history: HistoryCache::new(config.history_limit),
            indicator: None,
            stats,
        }
    }

    /// Share the session mirror and history cache with a [`crate::StateSync`].
    pub fn with_caches(mut self, mirror: SessionMirror, history: HistoryCache) -> Self {
        self.mirror = mirror;
        self.history = history;
        self
    }

    /// Attach a network indicator checked on every reading.
    pub fn with_indicator(mut self, indicator: NetworkIndicator) -> Self {
        self.indicator = Some(indicator);
        self
    }

    /// Current path for new readings.
    pub fn mode(&self) -> BridgeMode {
        if self.cloud.is_connected() {
            BridgeMode::Streaming
        } else {
            BridgeMode::Buffering
        }
    }

    /// Buffered readings awaiting a durable write.
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> BridgeStats {
        *self.stats.borrow()
    }

    /// Receiver for counter updates.
    pub fn subscribe_stats(&self) -> watch::Receiver<BridgeStats> {
        self.stats.subscribe()
    }

    /// Session mirror used for the live `smoking` flag.
    pub fn mirror(&self) -> &SessionMirror {
        &self.mirror
    }

    /// History cache fed by accepted readings.
    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    /// Decode a raw local payload and handle the reading.
    ///
    /// Malformed payloads are logged and dropped; nothing else is touched.
    pub async fn handle_payload(&mut self, payload: &str) -> Result<Disposition, BridgeError> {
        let temps = match LocalTemps::decode(payload) {
            Ok(temps) => temps,
            Err(err) => {
                self.stats.send_modify(|stats| stats.malformed += 1);
                warn!(payload, error = %err, "Dropping malformed reading");
                return Err(MalformedReadingError {
                    reason: err.to_string(),
                    payload: payload.to_string(),
                }
                .into());
            }
        };
        let reading = temps.into_reading(self.clock.now());
        Ok(self.handle_reading(reading).await)
    }

    /// Stream `reading` live, or buffer it when the cloud channel is down.
    pub async fn handle_reading(&mut self, reading: Reading) -> Disposition {
        if let Some(indicator) = &self.indicator {
            indicator.check();
        }
        self.history.push(reading);

        if self.cloud.is_connected() {
            if !self.batch.is_empty() {
                // Failure is logged inside; the batch stays for the next trigger.
                let _ = self.flush().await;
            }

            let live = CloudEvent::Live(LiveState {
                reading,
                smoking: self.mirror.smoking(),
            });
            match self.cloud.emit(live).await {
                Ok(()) => {
                    self.stats.send_modify(|stats| stats.forwarded += 1);
                    return Disposition::Streamed;
                }
                Err(err) => {
                    warn!(error = %err, "Live emit failed, buffering reading");
                }
            }
        }

        self.buffer(reading)
    }

    fn buffer(&mut self, reading: Reading) -> Disposition {
        if !self.decimator.admit() {
            self.stats.send_modify(|stats| stats.decimated_out += 1);
            return Disposition::Skipped;
        }

        if let Some(evicted) = self.batch.push(reading) {
            self.stats.send_modify(|stats| stats.evicted += 1);
            warn!(
                evicted_at = %evicted.timestamp,
                max_len = self.batch.max_len(),
                "Batch full, evicted oldest buffered reading"
            );
        }
        self.stats.send_modify(|stats| stats.buffered += 1);
        debug!(buffered = self.batch.len(), "Reading buffered");
        Disposition::Buffered
    }

    /// Write the whole batch durably, then signal `refresh` and clear it.
    ///
    /// Returns the number of readings written. On failure the batch is left
    /// exactly as it was.
    pub async fn flush(&mut self) -> Result<usize, BridgeError> {
        if self.batch.is_empty() {
            return Ok(0);
        }

        let records = self.batch.to_records();
        let count = records.len();
        let ingest = &self.ingest;
        let records = &records;
        let outcome = self
            .flush_retry
            .execute_with_context(move || ingest.post_batch(records))
            .await;
        let attempts = outcome.attempts;

        match outcome.into_result() {
            Ok(()) => {
                info!(count, attempts, "Flushed buffered readings");
                if let Err(err) = self.cloud.emit(CloudEvent::Refresh).await {
                    warn!(error = %err, "Failed to emit refresh after flush");
                }
                self.batch.clear();
                self.stats.send_modify(|stats| stats.flushes += 1);
                Ok(count)
            }
            Err(err) => {
                self.stats.send_modify(|stats| stats.flush_failures += 1);
                error!(
                    count,
                    attempts,
                    error = %err,
                    "Batch write failed, keeping buffered readings"
                );
                Err(BridgeError::DurableWrite {
                    attempts,
                    last_error: err.to_string(),
                })
            }
        }
    }

    /// React to a cloud link transition.
    pub async fn on_link_change(&mut self, state: LinkState) {
        info!(
            mode = ?BridgeMode::from(state),
            buffered = self.batch.len(),
            "Cloud link changed"
        );
        if state.is_connected() && !self.batch.is_empty() {
            let _ = self.flush().await;
        }
    }

    /// Process payloads from `frames` until it closes or `shutdown` flips.
    pub async fn run(
        &mut self,
        mut frames: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut link = self.cloud.link_state();
        let mut last = *link.borrow_and_update();
        let mut link_open = true;
        info!(mode = ?BridgeMode::from(last), "Bridge started");

        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                changed = link.changed(), if link_open => {
                    if changed.is_err() {
                        link_open = false;
                        continue;
                    }
                    let state = *link.borrow_and_update();
                    if state != last {
                        last = state;
                        self.on_link_change(state).await;
                    }
                }
                frame = frames.recv() => match frame {
                    Some(payload) => {
                        let _ = self.handle_payload(&payload).await;
                    }
                    None => {
                        info!("Local reading stream closed");
                        break;
                    }
                },
            }
        }

        if !self.batch.is_empty() {
            warn!(lost = self.batch.len(), "Bridge stopping with unflushed readings");
        }
        info!(stats = ?self.stats(), "Bridge stopped");
    }
}

impl<C, D> std::fmt::Debug for BridgeClient<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("buffered", &self.batch.len())
            .field("stats", &*self.stats.borrow())
            .finish_non_exhaustive()
    }
}
