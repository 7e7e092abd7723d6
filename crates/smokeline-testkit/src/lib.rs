//! Smokeline Testkit
//!
//! In-memory handlers for every effect trait in `smokeline-core`:
//!
//! - [`MemoryCloud`]: cloud channel and durable ingest in one, acting as the
//!   hub every bridge talks to. Records what was emitted and posted, in order.
//! - [`FixedClock`] / [`SteppingClock`]: deterministic timestamps.
//! - [`ScriptedProbe`]: connectivity answers fed from a script.
//! - [`fixtures`]: reading and payload builders.

#![forbid(unsafe_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod clock;
pub mod cloud;
pub mod fixtures;
pub mod probe;

pub use clock::{FixedClock, SteppingClock};
pub use cloud::{CloudCall, MemoryCloud};
pub use probe::ScriptedProbe;
