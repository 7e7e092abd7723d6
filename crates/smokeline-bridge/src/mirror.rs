//! Display-side caches
//!
//! [`SessionMirror`] tracks the cooking flag and probe labels as last
//! broadcast; it is an observer and never writes back. [`HistoryCache`] holds
//! recent readings for charting. Both are cheap to clone and shared between
//! the bridge and state sync tasks. Neither survives a restart.

use parking_lot::Mutex;
use smokeline_core::{CookingSession, ProbeNames, Reading, SmokeUpdate};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot held by [`SessionMirror`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorState {
    /// Active session identifier, empty when unknown
    pub session_id: String,
    /// Cooking flag as last observed
    pub smoking: bool,
    /// Probe labels as last observed
    pub names: ProbeNames,
}

/// Observable copy of the session flag and probe labels.
#[derive(Debug, Clone)]
pub struct SessionMirror {
    state: Arc<watch::Sender<MirrorState>>,
}

impl Default for SessionMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMirror {
    /// Mirror with default labels and the flag off.
    pub fn new() -> Self {
        let (state, _) = watch::channel(MirrorState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> MirrorState {
        self.state.borrow().clone()
    }

    /// Current cooking flag.
    pub fn smoking(&self) -> bool {
        self.state.borrow().smoking
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.state.subscribe()
    }

    /// Adopt a session record from the durable API.
    pub fn set_session(&self, session: &CookingSession) {
        self.state.send_modify(|state| {
            state.session_id = session.session_id.clone();
            state.smoking = session.smoking;
        });
    }

    /// Adopt probe labels.
    pub fn set_names(&self, names: ProbeNames) {
        self.state.send_modify(|state| state.names = names);
    }

    /// Apply a `smokeUpdate` broadcast; labels are kept when the update has none.
    pub fn apply(&self, update: &SmokeUpdate) {
        self.state.send_modify(|state| {
            state.smoking = update.smoking;
            if let Some(names) = &update.names {
                state.names = names.clone();
            }
        });
    }
}

/// Bounded cache of recent readings, oldest first.
#[derive(Debug, Clone)]
pub struct HistoryCache {
    entries: Arc<Mutex<VecDeque<Reading>>>,
    limit: usize,
}

impl HistoryCache {
    /// Cache keeping the newest `limit` readings.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            limit: limit.max(1),
        }
    }

    /// Append a reading, evicting the oldest beyond the limit.
    pub fn push(&self, reading: Reading) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.limit {
            entries.pop_front();
        }
        entries.push_back(reading);
    }

    /// Replace the contents with `readings`, keeping the newest ones.
    pub fn replace(&self, readings: impl IntoIterator<Item = Reading>) {
        let mut entries = self.entries.lock();
        entries.clear();
        for reading in readings {
            if entries.len() >= self.limit {
                entries.pop_front();
            }
            entries.push_back(reading);
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Copy of the cached readings.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.entries.lock().iter().copied().collect()
    }

    /// Number of cached readings.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
