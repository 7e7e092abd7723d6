//! Synthetic reading generator
//!
//! Each tick adds a fixed delta to every channel. When the candidate state
//! would push any channel above [`RESET_ABOVE`], all channels restart from zero
//! and the tick's deltas are applied to the zeroed state, so the sequence
//! cycles through `{1,2,3,4}` again instead of stalling at zero for a tick.

use serde_json::json;

/// Readings above this value trigger a reset on the tick that would produce them.
pub const RESET_ABOVE: u32 = 500;

/// Per-tick deltas in `[meat, meat2, meat3, chamber]` order.
pub const CHANNEL_DELTAS: [u32; 4] = [1, 2, 3, 4];

/// Composite state of the emulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmulatorState {
    /// Probe 1
    pub meat: u32,
    /// Probe 2
    pub meat2: u32,
    /// Probe 3
    pub meat3: u32,
    /// Chamber
    pub chamber: u32,
}

impl EmulatorState {
    /// Build a state from explicit channel values.
    pub fn new(meat: u32, meat2: u32, meat3: u32, chamber: u32) -> Self {
        Self {
            meat,
            meat2,
            meat3,
            chamber,
        }
    }

    fn advanced(self) -> Self {
        let [d1, d2, d3, d4] = CHANNEL_DELTAS;
        Self {
            meat: self.meat.saturating_add(d1),
            meat2: self.meat2.saturating_add(d2),
            meat3: self.meat3.saturating_add(d3),
            chamber: self.chamber.saturating_add(d4),
        }
    }

    fn channels(&self) -> [u32; 4] {
        [self.meat, self.meat2, self.meat3, self.chamber]
    }

    /// Advance one tick and return the new state.
    pub fn tick(&mut self) -> Self {
        let candidate = self.advanced();
        *self = if candidate.channels().iter().any(|value| *value > RESET_ABOVE) {
            Self::default().advanced()
        } else {
            candidate
        };
        *self
    }

    /// Encode as a local wire line.
    pub fn to_payload(&self) -> String {
        json!({
            "Chamber": self.chamber,
            "Meat": self.meat,
            "Meat2": self.meat2,
            "Meat3": self.meat3,
        })
        .to_string()
    }
}
