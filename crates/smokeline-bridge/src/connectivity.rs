//! TCP connectivity probe

use async_trait::async_trait;
use smokeline_core::{BridgeConfig, ConnectivityProbe};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Considers the network up when a TCP connection to `target` succeeds in time.
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    target: String,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    /// Probe dialing `target` (`host:port`).
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }

    /// Probe from bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.probe_target.clone(), config.probe_timeout())
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_online(&self) -> bool {
        matches!(
            timeout(self.timeout, TcpStream::connect(self.target.as_str())).await,
            Ok(Ok(_))
        )
    }
}
