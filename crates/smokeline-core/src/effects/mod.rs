//! Effect traits
//!
//! Every side effect the pipeline performs goes through one of these traits so
//! the bridge and state sync logic can be driven by in-memory handlers in tests
//! and by network adapters in production.
//!
//! | Trait                  | Production handler                 |
//! |------------------------|------------------------------------|
//! | [`Clock`]              | [`SystemClock`]                    |
//! | [`CloudChannel`]       | WebSocket channel with reconnect   |
//! | [`DurableIngest`]      | HTTP client for the durable API    |
//! | [`ConnectivityProbe`]  | TCP dial to a well-known host      |

pub mod cloud;
pub mod connectivity;
pub mod ingest;
pub mod time;

pub use cloud::{CloudChannel, CloudError, LinkState};
pub use connectivity::{ConnectivityProbe, NetworkStatus};
pub use ingest::{DurableIngest, IngestError};
pub use time::{Clock, SystemClock};
