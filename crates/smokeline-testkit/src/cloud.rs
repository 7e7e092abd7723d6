//! In-memory cloud hub
//!
//! One [`MemoryCloud`] stands in for the whole backend: the event hub that
//! rebroadcasts every emitted event to every subscriber, and the durable API
//! that stores posted readings and owns the cooking session. Clones share
//! state, so several bridges can be attached to the same hub.

use async_trait::async_trait;
use parking_lot::Mutex;
use smokeline_core::{
    CloudChannel, CloudError, CloudEvent, CookingSession, DurableIngest, IngestError, LinkState,
    ProbeNames, TempRecord,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// One observable interaction with the hub, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudCall {
    /// A successful `POST temps/batch` with this many records
    PostBatch(usize),
    /// A rejected `POST temps/batch`
    PostBatchFailed(usize),
    /// An event accepted on the channel
    Emit(CloudEvent),
}

#[derive(Debug)]
struct Inner {
    link: watch::Sender<LinkState>,
    events: broadcast::Sender<CloudEvent>,
    journal: Mutex<Vec<CloudCall>>,
    records: Mutex<Vec<TempRecord>>,
    session: Mutex<CookingSession>,
    names: Mutex<Option<ProbeNames>>,
    failing_posts: AtomicU32,
    ingest_down: Mutex<bool>,
}

/// Shared in-memory cloud channel and durable store.
#[derive(Debug, Clone)]
pub struct MemoryCloud {
    inner: Arc<Inner>,
}

impl Default for MemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCloud {
    /// Connected hub with an empty store and an active, not-cooking session.
    pub fn new() -> Self {
        let (link, _) = watch::channel(LinkState::Connected);
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                link,
                events,
                journal: Mutex::new(Vec::new()),
                records: Mutex::new(Vec::new()),
                session: Mutex::new(CookingSession {
                    session_id: "smoke-1".to_string(),
                    smoking: false,
                }),
                names: Mutex::new(None),
                failing_posts: AtomicU32::new(0),
                ingest_down: Mutex::new(false),
            }),
        }
    }

    /// Hub that starts disconnected.
    pub fn disconnected() -> Self {
        let cloud = Self::new();
        cloud.set_connected(false);
        cloud
    }

    /// Flip the channel link state.
    pub fn set_connected(&self, connected: bool) {
        let state = if connected {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        self.inner.link.send_replace(state);
    }

    /// Reject the next `count` batch posts.
    pub fn fail_next_posts(&self, count: u32) {
        self.inner.failing_posts.store(count, Ordering::SeqCst);
    }

    /// Make every durable call fail until re-enabled.
    pub fn set_ingest_available(&self, available: bool) {
        *self.inner.ingest_down.lock() = !available;
    }

    /// Replace the session record.
    pub fn set_session(&self, session: CookingSession) {
        *self.inner.session.lock() = session;
    }

    /// Set the current smoke profile's probe labels.
    pub fn set_probe_names(&self, names: ProbeNames) {
        *self.inner.names.lock() = Some(names);
    }

    /// Preload stored readings.
    pub fn seed_records(&self, records: impl IntoIterator<Item = TempRecord>) {
        self.inner.records.lock().extend(records);
    }

    /// Deliver an event to subscribers as if another client broadcast it.
    pub fn push_inbound(&self, event: CloudEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Every interaction so far.
    pub fn journal(&self) -> Vec<CloudCall> {
        self.inner.journal.lock().clone()
    }

    /// Every event accepted on the channel.
    pub fn emitted(&self) -> Vec<CloudEvent> {
        self.inner
            .journal
            .lock()
            .iter()
            .filter_map(|call| match call {
                CloudCall::Emit(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Accepted events with the given wire name.
    pub fn emitted_named(&self, name: &str) -> Vec<CloudEvent> {
        self.emitted()
            .into_iter()
            .filter(|event| event.name() == name)
            .collect()
    }

    /// Stored readings.
    pub fn records(&self) -> Vec<TempRecord> {
        self.inner.records.lock().clone()
    }

    /// Successful batch posts so far.
    pub fn post_count(&self) -> usize {
        self.inner
            .journal
            .lock()
            .iter()
            .filter(|call| matches!(call, CloudCall::PostBatch(_)))
            .count()
    }

    /// Current session record.
    pub fn current_session(&self) -> CookingSession {
        self.inner.session.lock().clone()
    }

    fn check_available(&self) -> Result<(), IngestError> {
        if *self.inner.ingest_down.lock() {
            Err(IngestError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CloudChannel for MemoryCloud {
    fn link_state(&self) -> watch::Receiver<LinkState> {
        self.inner.link.subscribe()
    }

    async fn emit(&self, event: CloudEvent) -> Result<(), CloudError> {
        if !self.inner.link.borrow().is_connected() {
            return Err(CloudError::NotConnected);
        }
        self.inner.journal.lock().push(CloudCall::Emit(event.clone()));
        let _ = self.inner.events.send(event);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CloudEvent> {
        self.inner.events.subscribe()
    }
}

#[async_trait]
impl DurableIngest for MemoryCloud {
    async fn post_batch(&self, records: &[TempRecord]) -> Result<(), IngestError> {
        self.check_available()?;
        let failing = self.inner.failing_posts.load(Ordering::SeqCst);
        if failing > 0 {
            self.inner.failing_posts.store(failing - 1, Ordering::SeqCst);
            self.inner
                .journal
                .lock()
                .push(CloudCall::PostBatchFailed(records.len()));
            return Err(IngestError::Status {
                status: 503,
                endpoint: "temps/batch".to_string(),
            });
        }

        let temps_id = self.inner.session.lock().session_id.clone();
        self.inner
            .records
            .lock()
            .extend(records.iter().cloned().map(|mut record| {
                record.temps_id.get_or_insert_with(|| temps_id.clone());
                record
            }));
        self.inner
            .journal
            .lock()
            .push(CloudCall::PostBatch(records.len()));
        Ok(())
    }

    async fn current_history(&self) -> Result<Vec<TempRecord>, IngestError> {
        self.check_available()?;
        let temps_id = self.inner.session.lock().session_id.clone();
        self.history_by_id(&temps_id).await
    }

    async fn history_by_id(&self, id: &str) -> Result<Vec<TempRecord>, IngestError> {
        self.check_available()?;
        Ok(self
            .inner
            .records
            .lock()
            .iter()
            .filter(|record| record.temps_id.as_deref() == Some(id))
            .cloned()
            .collect())
    }

    async fn toggle_smoking(&self) -> Result<CookingSession, IngestError> {
        self.check_available()?;
        let mut session = self.inner.session.lock();
        session.smoking = !session.smoking;
        Ok(session.clone())
    }

    async fn session(&self) -> Result<CookingSession, IngestError> {
        self.check_available()?;
        Ok(self.inner.session.lock().clone())
    }

    async fn current_probe_names(&self) -> Result<ProbeNames, IngestError> {
        self.check_available()?;
        self.inner
            .names
            .lock()
            .clone()
            .ok_or(IngestError::Status {
                status: 404,
                endpoint: "smokeProfile/current".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn emit_requires_connection_and_rebroadcasts() {
        let cloud = MemoryCloud::new();
        let mut rx = cloud.subscribe();
        cloud.emit(CloudEvent::Refresh).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), CloudEvent::Refresh);

        cloud.set_connected(false);
        assert_eq!(cloud.emit(CloudEvent::Clear).await, Err(CloudError::NotConnected));
        assert_eq!(cloud.emitted(), vec![CloudEvent::Refresh]);
    }

    #[tokio::test]
    async fn failed_posts_store_nothing() {
        let cloud = MemoryCloud::new();
        let record = TempRecord::from(&fixtures::reading(225.0, 140.0, 0.0, 0.0, 0));
        cloud.fail_next_posts(1);
        assert!(cloud.post_batch(&[record.clone()]).await.is_err());
        cloud.post_batch(&[record]).await.unwrap();

        assert_eq!(
            cloud.journal(),
            vec![CloudCall::PostBatchFailed(1), CloudCall::PostBatch(1)]
        );
        assert_eq!(cloud.current_history().await.unwrap().len(), 1);
    }
}
