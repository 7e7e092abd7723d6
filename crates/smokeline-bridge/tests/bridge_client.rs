//! BridgeClient streaming, buffering and flush behavior

use assert_matches::assert_matches;
use async_trait::async_trait;
use smokeline_bridge::{BridgeClient, BridgeError, Disposition, NetworkIndicator};
use smokeline_core::{
    BridgeConfig, CloudChannel, CloudError, CloudEvent, LinkState, LocalTemps, RetryPolicy,
};
use smokeline_testkit::{fixtures, CloudCall, MemoryCloud, ScriptedProbe, SteppingClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

fn config(threshold: u32) -> BridgeConfig {
    BridgeConfig {
        decimation_threshold: threshold,
        flush_retry: RetryPolicy::fixed(Duration::ZERO).with_max_attempts(2),
        ..BridgeConfig::default()
    }
}

fn bridge(cloud: &MemoryCloud, config: &BridgeConfig) -> BridgeClient<MemoryCloud, MemoryCloud> {
    BridgeClient::new(
        cloud.clone(),
        cloud.clone(),
        Arc::new(SteppingClock::default()),
        config,
    )
}

async fn feed(bridge: &mut BridgeClient<MemoryCloud, MemoryCloud>, payloads: &[String]) {
    for payload in payloads {
        bridge.handle_payload(payload).await.unwrap();
    }
}

#[tokio::test]
async fn eleven_offline_readings_buffer_exactly_one() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(11));
    let payloads = fixtures::payloads(11);

    feed(&mut bridge, &payloads).await;

    assert_eq!(bridge.batch().len(), 1);
    let buffered = bridge.batch().iter().next().copied().unwrap();
    let latest = LocalTemps::decode(&payloads[10]).unwrap();
    assert_eq!(buffered.chamber_temp, latest.chamber);
    assert_eq!(buffered.probe3_temp, latest.meat3);

    let stats = bridge.stats();
    assert_eq!(stats.buffered, 1);
    assert_eq!(stats.decimated_out, 10);
    assert!(cloud.journal().is_empty());
}

#[tokio::test]
async fn reconnect_flushes_then_refreshes_then_streams() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(11));
    feed(&mut bridge, &fixtures::payloads(22)).await;
    assert_eq!(bridge.batch().len(), 2);

    cloud.set_connected(true);
    let live_payload = fixtures::payload(230.0, 150.0, 160.0, 170.0);
    let disposition = bridge.handle_payload(&live_payload).await.unwrap();

    assert_eq!(disposition, Disposition::Streamed);
    assert!(bridge.batch().is_empty());
    let journal = cloud.journal();
    assert_eq!(journal.len(), 3);
    assert_eq!(journal[0], CloudCall::PostBatch(2));
    assert_eq!(journal[1], CloudCall::Emit(CloudEvent::Refresh));
    assert_matches!(
        &journal[2],
        CloudCall::Emit(CloudEvent::Live(state)) if state.reading.chamber_temp == 230.0
    );
    assert_eq!(cloud.records().len(), 2);
}

#[tokio::test]
async fn flush_failure_keeps_batch_and_still_streams() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(1));
    feed(&mut bridge, &fixtures::payloads(2)).await;

    cloud.set_connected(true);
    cloud.fail_next_posts(3);
    let disposition = bridge
        .handle_payload(&fixtures::payload(230.0, 150.0, 0.0, 0.0))
        .await
        .unwrap();

    assert_eq!(disposition, Disposition::Streamed);
    assert_eq!(bridge.batch().len(), 2);
    assert_eq!(bridge.stats().flush_failures, 1);
    assert!(cloud.emitted_named("refresh").is_empty());
    assert_eq!(cloud.emitted_named("events").len(), 1);
    assert_eq!(
        cloud.journal()[..3],
        [
            CloudCall::PostBatchFailed(2),
            CloudCall::PostBatchFailed(2),
            CloudCall::PostBatchFailed(2),
        ]
    );

    // The next trigger retries and succeeds.
    bridge
        .handle_payload(&fixtures::payload(231.0, 151.0, 0.0, 0.0))
        .await
        .unwrap();
    assert!(bridge.batch().is_empty());
    assert_eq!(cloud.records().len(), 2);
    assert_eq!(cloud.emitted_named("refresh").len(), 1);
}

#[tokio::test]
async fn explicit_flush_reports_exhausted_retries() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(1));
    feed(&mut bridge, &fixtures::payloads(1)).await;

    cloud.set_ingest_available(false);
    let err = bridge.flush().await.unwrap_err();
    assert_matches!(err, BridgeError::DurableWrite { attempts: 3, .. });
    assert_eq!(bridge.batch().len(), 1);
}

#[tokio::test]
async fn malformed_payloads_are_dropped() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(11));

    feed(&mut bridge, &fixtures::payloads(10)).await;
    for bad in ["not json", r#"{"Meat":"invalid","Chamber":100}"#, r#"{"Meat":1}"#] {
        assert_matches!(
            bridge.handle_payload(bad).await,
            Err(BridgeError::MalformedReading(ref err)) if err.payload == bad
        );
    }
    assert!(bridge.batch().is_empty());

    // Malformed payloads did not advance the decimation counter.
    feed(&mut bridge, &fixtures::payloads(1)).await;
    assert_eq!(bridge.batch().len(), 1);
    assert_eq!(bridge.stats().malformed, 3);

    cloud.set_connected(true);
    assert!(bridge.handle_payload("{").await.is_err());
    assert!(cloud.emitted_named("events").is_empty());
}

#[tokio::test]
async fn full_batch_evicts_oldest() {
    let cloud = MemoryCloud::disconnected();
    let config = BridgeConfig {
        max_buffered: 2,
        ..config(1)
    };
    let mut bridge = bridge(&cloud, &config);
    feed(&mut bridge, &fixtures::payloads(3)).await;

    assert_eq!(bridge.batch().len(), 2);
    assert_eq!(bridge.stats().evicted, 1);
    let first = bridge.batch().iter().next().unwrap();
    assert_eq!(first.chamber_temp, 201.0);
}

#[tokio::test]
async fn link_up_flushes_without_waiting_for_a_reading() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(1));
    feed(&mut bridge, &fixtures::payloads(3)).await;

    cloud.set_connected(true);
    bridge.on_link_change(LinkState::Connected).await;

    assert!(bridge.batch().is_empty());
    assert_eq!(
        cloud.journal(),
        vec![CloudCall::PostBatch(3), CloudCall::Emit(CloudEvent::Refresh)]
    );
}

#[tokio::test]
async fn run_loop_buffers_and_flushes_on_link_edge() {
    let cloud = MemoryCloud::disconnected();
    let mut bridge = bridge(&cloud, &config(11));
    let mut stats = bridge.subscribe_stats();
    let (frames_tx, frames_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let runner = tokio::spawn(async move {
        bridge.run(frames_rx, shutdown_rx).await;
        bridge
    });

    for payload in fixtures::payloads(11) {
        frames_tx.send(payload).await.unwrap();
    }
    stats.wait_for(|stats| stats.buffered == 1).await.unwrap();

    cloud.set_connected(true);
    stats.wait_for(|stats| stats.flushes == 1).await.unwrap();

    frames_tx
        .send(fixtures::payload(240.0, 160.0, 0.0, 0.0))
        .await
        .unwrap();
    stats.wait_for(|stats| stats.forwarded == 1).await.unwrap();

    shutdown_tx.send(true).unwrap();
    let bridge = runner.await.unwrap();
    assert!(bridge.batch().is_empty());
    assert_eq!(cloud.records().len(), 1);
    assert_eq!(
        cloud.journal()[..2],
        [CloudCall::PostBatch(1), CloudCall::Emit(CloudEvent::Refresh)]
    );
}

#[tokio::test]
async fn live_events_carry_mirror_flag_and_feed_history() {
    let cloud = MemoryCloud::new();
    let mut bridge = bridge(&cloud, &config(11));
    bridge
        .mirror()
        .apply(&smokeline_core::SmokeUpdate::flag_only(true));

    feed(&mut bridge, &fixtures::payloads(2)).await;

    assert_eq!(bridge.history().len(), 2);
    let live = cloud.emitted_named("events");
    assert_matches!(&live[0], CloudEvent::Live(state) if state.smoking);
}

#[tokio::test]
async fn network_indicator_never_changes_the_path() {
    let cloud = MemoryCloud::new();
    let probe = Arc::new(ScriptedProbe::constant(false));
    let indicator = NetworkIndicator::new(probe.clone());
    let mut status = indicator.subscribe();
    let mut bridge = bridge(&cloud, &config(11)).with_indicator(indicator.clone());

    let disposition = bridge
        .handle_payload(&fixtures::payload(225.0, 140.0, 0.0, 0.0))
        .await
        .unwrap();
    assert_eq!(disposition, Disposition::Streamed);

    status.changed().await.unwrap();
    assert_eq!(indicator.status(), smokeline_core::NetworkStatus::Offline);
    assert!(probe.calls() >= 1);
}

/// Reports a live link but loses every frame before it reaches the socket.
struct DroppingLink(MemoryCloud);

#[async_trait]
impl CloudChannel for DroppingLink {
    fn link_state(&self) -> watch::Receiver<LinkState> {
        self.0.link_state()
    }

    async fn emit(&self, _event: CloudEvent) -> Result<(), CloudError> {
        Err(CloudError::NotConnected)
    }

    fn subscribe(&self) -> broadcast::Receiver<CloudEvent> {
        self.0.subscribe()
    }
}

#[tokio::test]
async fn unwritten_live_frame_falls_back_to_batch() {
    let cloud = MemoryCloud::new();
    let mut bridge = BridgeClient::new(
        DroppingLink(cloud.clone()),
        cloud.clone(),
        Arc::new(SteppingClock::default()),
        &config(1),
    );

    let disposition = bridge
        .handle_payload(&fixtures::payload(225.0, 140.0, 0.0, 0.0))
        .await
        .unwrap();

    assert_eq!(disposition, Disposition::Buffered);
    assert_eq!(bridge.batch().len(), 1);
    let stats = bridge.stats();
    assert_eq!(stats.forwarded, 0);
    assert_eq!(stats.buffered, 1);
}
