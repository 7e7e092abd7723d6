//! Smokeline Bridge: Live Streaming, Offline Buffering and State Sync
//!
//! Runs next to the display. [`BridgeClient`] takes every reading from the
//! local relay and either streams it to the cloud channel or, while that
//! channel is down, keeps a decimated backlog it writes durably once the link
//! returns. [`StateSync`] owns the only write path for the cooking flag and
//! keeps the display's caches in step with cloud broadcasts.
//!
//! Both are generic over the effect traits in `smokeline-core`. The adapters
//! here ([`WsCloudChannel`], [`HttpIngestClient`], [`LocalRelayClient`],
//! [`TcpConnectivityProbe`]) are the production handlers.

#![forbid(unsafe_code)]

pub mod batch;
pub mod client;
pub mod connectivity;
pub mod error;
pub mod http;
pub mod indicator;
pub mod local;
pub mod mirror;
pub mod runtime;
pub mod state_sync;
pub mod websocket;

pub use batch::{Batch, Decimator};
pub use client::{BridgeClient, BridgeMode, BridgeStats, Disposition};
pub use connectivity::TcpConnectivityProbe;
pub use error::{BridgeError, MalformedReadingError};
pub use http::HttpIngestClient;
pub use indicator::NetworkIndicator;
pub use local::LocalRelayClient;
pub use mirror::{HistoryCache, MirrorState, SessionMirror};
pub use runtime::{run_bridge, toggle_once};
pub use state_sync::StateSync;
pub use websocket::WsCloudChannel;
