//! Offline backlog
//!
//! While the cloud channel is down the bridge keeps one reading out of every
//! `threshold` in a bounded [`Batch`]. The batch has a single writer (the
//! bridge task) and is cleared only after the durable write is confirmed.

use smokeline_core::{Reading, TempRecord};
use std::collections::VecDeque;

/// Ordered, bounded backlog of readings awaiting a durable write.
#[derive(Debug, Clone)]
pub struct Batch {
    entries: VecDeque<Reading>,
    max_len: usize,
}

impl Batch {
    /// Empty batch holding at most `max_len` readings.
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_len: max_len.max(1),
        }
    }

    /// Append a copy of `reading`; returns the oldest entry if it had to be evicted.
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        let evicted = if self.entries.len() >= self.max_len {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(reading);
        evicted
    }

    /// Durable form of every entry, oldest first.
    pub fn to_records(&self) -> Vec<TempRecord> {
        self.entries.iter().map(TempRecord::from).collect()
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.entries.iter()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffered readings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity before eviction starts.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

/// 1-of-N subsampler for offline readings.
///
/// Counts every offline reading and admits one when the count reaches the
/// threshold, then starts over. A threshold of 11 admits exactly one reading
/// out of 11 consecutive ones.
#[derive(Debug, Clone)]
pub struct Decimator {
    counter: u32,
    threshold: u32,
}

impl Decimator {
    /// Subsampler admitting one reading per `threshold` (minimum 1).
    pub fn new(threshold: u32) -> Self {
        Self {
            counter: 0,
            threshold: threshold.max(1),
        }
    }

    /// Count one reading; true if it should be buffered.
    pub fn admit(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.threshold {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    /// Readings counted since the last admission.
    pub fn pending(&self) -> u32 {
        self.counter
    }

    /// Configured threshold.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
