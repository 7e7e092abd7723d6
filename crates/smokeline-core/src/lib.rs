//! Smokeline Core: Readings, Wire Formats and Effect Traits
//!
//! Foundation crate for the smokeline telemetry pipeline. Everything that both
//! the sensor host and the display bridge need to agree on lives here.
//!
//! # Pipeline
//!
//! ```text
//! SensorSource ──► LocalRelay ("temp") ──► BridgeClient ──┬─► cloud channel ("events")
//!                                                          └─► Batch ──► POST /temps/batch
//!
//! StateSync: PUT /state/toggleSmoking ──► "smokeUpdate" broadcast ──► every bridge
//! ```
//!
//! # Contents
//!
//! - **Domain**: [`Reading`], [`SensorFrame`], [`SanityClass`], [`CookingSession`]
//! - **Wire**: local channel envelope, cloud channel events, durable API records
//! - **Effects**: [`Clock`], [`CloudChannel`], [`DurableIngest`], [`ConnectivityProbe`]
//! - **Policies**: [`RetryPolicy`] with backoff, [`Multicast`] subscriber registry
//! - **Configuration**: [`SmokelineConfig`] loaded from TOML plus environment

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod events;
pub mod fanout;
pub mod reading;
pub mod reliability;
pub mod session;
pub mod wire;

pub use config::{
    BridgeConfig, CloudConfig, ReconnectConfig, RelayConfig, SensorConfig, SensorMode,
    SmokelineConfig,
};
pub use effects::{
    Clock, CloudChannel, CloudError, ConnectivityProbe, DurableIngest, IngestError, LinkState,
    NetworkStatus, SystemClock,
};
pub use errors::{Result, SmokelineError};
pub use events::{CloudEvent, LiveState};
pub use fanout::{Multicast, SubscriptionId};
pub use reading::{Reading, SanityClass, SensorFrame, TOO_COLD_BELOW, TOO_HOT_ABOVE};
pub use reliability::{BackoffStrategy, RetryPolicy, RetryResult};
pub use session::{CookingSession, ProbeNames, SmokeUpdate, SmokingState};
pub use wire::{LocalMessage, LocalTemps, TempRecord, LOCAL_TEMP_EVENT};
