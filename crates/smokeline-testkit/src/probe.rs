//! Scripted connectivity probe

use async_trait::async_trait;
use parking_lot::Mutex;
use smokeline_core::ConnectivityProbe;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers from a queue, then from a fallback value.
#[derive(Debug)]
pub struct ScriptedProbe {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    /// Probe that always answers `online`.
    pub fn constant(online: bool) -> Self {
        Self::scripted([], online)
    }

    /// Probe answering `script` in order, then `fallback`.
    pub fn scripted(script: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of checks performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for ScriptedProbe {
    async fn is_online(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }
}
