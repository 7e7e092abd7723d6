//! Smokeline Sensor: Reading Acquisition and Local Fan-out
//!
//! Runs on the sensor host. [`SensorSource`] produces raw sensor frames either
//! from a synthetic emulator or from the serial probe interface, logs their
//! sanity class, and hands each frame to its subscribers. [`LocalRelay`] is one
//! such subscriber: it republishes every frame on the local "temp" channel to
//! whichever display clients are connected at that moment.
//!
//! Nothing here knows about the cloud. Frames are forwarded unmodified, even
//! when they classify as out of range or cannot be parsed at all.

#![forbid(unsafe_code)]

pub mod emulator;
pub mod error;
pub mod hardware;
pub mod relay;
pub mod runtime;
pub mod sanity;
pub mod source;

pub use emulator::{EmulatorState, CHANNEL_DELTAS, RESET_ABOVE};
pub use error::{SensorError, SensorReadError};
pub use hardware::{LineAssembler, SerialLineReader};
pub use relay::LocalRelay;
pub use runtime::run_sensor_host;
pub use source::SensorSource;
