//! Display bridge wiring

use smokeline_core::{Clock, CloudChannel, SmokelineConfig, SmokingState, SystemClock};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::client::BridgeClient;
use crate::connectivity::TcpConnectivityProbe;
use crate::error::BridgeError;
use crate::http::HttpIngestClient;
use crate::indicator::NetworkIndicator;
use crate::local::LocalRelayClient;
use crate::mirror::{HistoryCache, SessionMirror};
use crate::state_sync::StateSync;
use crate::websocket::WsCloudChannel;

const FRAME_BUFFER: usize = 256;

/// Run BridgeClient and StateSync against the configured endpoints until
/// `shutdown` flips.
pub async fn run_bridge(
    config: &SmokelineConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<(), BridgeError> {
    let cloud = Arc::new(WsCloudChannel::connect(&config.cloud, shutdown.clone())?);
    let ingest = Arc::new(HttpIngestClient::new(&config.cloud)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mirror = SessionMirror::new();
    let history = HistoryCache::new(config.bridge.history_limit);

    let sync = StateSync::new(
        cloud.clone(),
        ingest.clone(),
        clock.clone(),
        mirror.clone(),
        history.clone(),
    );
    sync.bootstrap().await;

    let indicator = NetworkIndicator::new(Arc::new(TcpConnectivityProbe::from_config(
        &config.bridge,
    )));
    let mut bridge = BridgeClient::new(cloud.clone(), ingest, clock, &config.bridge)
        .with_caches(mirror, history)
        .with_indicator(indicator);

    let (frames_tx, frames_rx) = mpsc::channel(FRAME_BUFFER);
    let relay = LocalRelayClient::new(&config.bridge.relay_url, config.cloud.reconnect.clone())?;
    let relay_task = tokio::spawn(relay.run(frames_tx, shutdown.clone()));
    let sync_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { sync.run(shutdown).await })
    };

    bridge.run(frames_rx, shutdown).await;

    relay_task.abort();
    sync_task.abort();
    cloud.close().await;
    info!("Display bridge stopped");
    Ok(())
}

/// Toggle the cooking flag once and broadcast it, as an operator command.
pub async fn toggle_once(config: &SmokelineConfig) -> Result<SmokingState, BridgeError> {
    let (_shutdown_tx, shutdown) = watch::channel(false);
    let cloud = Arc::new(WsCloudChannel::connect(&config.cloud, shutdown)?);
    let ingest = HttpIngestClient::new(&config.cloud)?;

    let mut link = cloud.link_state();
    if timeout(config.cloud.timeout(), link.wait_for(|state| state.is_connected()))
        .await
        .is_err()
    {
        warn!("Cloud channel not connected, smokeUpdate will not be broadcast");
    }

    let sync = StateSync::new(
        cloud.clone(),
        ingest,
        Arc::new(SystemClock),
        SessionMirror::new(),
        HistoryCache::new(1),
    );
    let toggled = sync.toggle().await;
    cloud.close().await;
    toggled
}
