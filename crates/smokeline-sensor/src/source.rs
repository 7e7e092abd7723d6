//! SensorSource
//!
//! Emits [`SensorFrame`]s to every subscriber in emission order until shut
//! down. Emulator mode ticks on a timer; hardware mode emits once per line.

use smokeline_core::{Clock, Multicast, SensorConfig, SensorFrame, SensorMode, SubscriptionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::emulator::EmulatorState;
use crate::error::SensorError;
use crate::hardware::{LineResult, SerialLineReader};
use crate::sanity;

const LINE_BUFFER: usize = 64;

/// Reading producer with a multicast subscriber registry.
pub struct SensorSource {
    subscribers: Multicast<SensorFrame>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Sender<bool>,
}

impl SensorSource {
    /// Create a source stamping frames with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            subscribers: Multicast::new(),
            clock,
            shutdown,
        }
    }

    /// Register a frame handler. Handlers run on the source's task and must not block.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SensorFrame) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(handler)
    }

    /// Remove a frame handler.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Classify and deliver one raw payload. Returns the number of handlers called.
    pub fn publish(&self, payload: impl Into<String>) -> usize {
        let frame = SensorFrame::new(payload, self.clock.now());
        // Out-of-range and unparseable frames are still delivered.
        let _ = sanity::inspect(&frame);
        self.subscribers.emit(&frame)
    }

    /// Stop a running [`SensorSource::start`].
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Run in the configured mode until [`SensorSource::shutdown`] is called.
    pub async fn start(&self, config: &SensorConfig) -> Result<(), SensorError> {
        match config.mode {
            SensorMode::Emulator => {
                info!(interval_ms = config.emit_interval_ms, "Starting sensor emulator");
                self.run_emulator(config.emit_interval()).await;
                Ok(())
            }
            SensorMode::Hardware => {
                info!(path = %config.serial_path, "Starting serial sensor");
                let (tx, rx) = mpsc::channel(LINE_BUFFER);
                let reader = SerialLineReader::new(&config.serial_path, config.baud_rate);
                // The reader thread exits once `rx` is dropped.
                let _reader = reader.spawn(tx)?;
                self.run_lines(rx).await;
                if *self.shutdown.borrow() {
                    Ok(())
                } else {
                    Err(SensorError::serial(&config.serial_path, "line source ended"))
                }
            }
        }
    }

    /// Emit one emulator frame every `period`, first one after a full period.
    pub async fn run_emulator(&self, period: Duration) {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return;
        }
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = EmulatorState::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    state.tick();
                    self.publish(state.to_payload());
                }
                _ = shutdown.changed() => {
                    debug!("Sensor emulator stopped");
                    return;
                }
            }
        }
    }

    /// Emit one frame per received line until the line source ends or shutdown.
    pub async fn run_lines(&self, mut lines: mpsc::Receiver<LineResult>) {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                line = lines.recv() => match line {
                    Some(Ok(payload)) => {
                        self.publish(payload);
                    }
                    Some(Err(err)) => {
                        warn!(
                            error = %err,
                            payload = ?err.payload,
                            "Skipping undecodable sensor line"
                        );
                    }
                    None => {
                        warn!("Sensor line source ended");
                        return;
                    }
                },
                _ = shutdown.changed() => {
                    debug!("Sensor line reader stopped");
                    return;
                }
            }
        }
    }
}

impl std::fmt::Debug for SensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSource")
            .field("subscribers", &self.subscribers.subscriber_count())
            .finish_non_exhaustive()
    }
}
