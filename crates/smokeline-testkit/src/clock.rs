//! Deterministic clocks

use chrono::{DateTime, Duration, TimeZone, Utc};
use smokeline_core::Clock;
use std::sync::atomic::{AtomicI64, Ordering};

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(epoch())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Advances by a fixed step on every call.
#[derive(Debug)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    step_ms: i64,
    calls: AtomicI64,
}

impl SteppingClock {
    /// Clock starting at `start`, advancing `step` per call.
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step_ms: step.num_milliseconds(),
            calls: AtomicI64::new(0),
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::new(epoch(), Duration::milliseconds(500))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        self.start + Duration::milliseconds(self.step_ms * n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepping_clock_advances() {
        let clock = SteppingClock::default();
        let first = clock.now();
        assert_eq!(clock.now() - first, Duration::milliseconds(500));
    }
}
