//! StateSync toggling and broadcast handling

use smokeline_bridge::{HistoryCache, SessionMirror, StateSync};
use smokeline_core::{
    CloudEvent, CookingSession, DurableIngest, ProbeNames, SmokeUpdate, SmokingState, TempRecord,
};
use smokeline_testkit::{fixtures, FixedClock, MemoryCloud};
use std::sync::Arc;
use tokio::sync::watch;

fn state_sync(cloud: &MemoryCloud) -> StateSync<MemoryCloud, MemoryCloud> {
    StateSync::new(
        cloud.clone(),
        cloud.clone(),
        Arc::new(FixedClock::default()),
        SessionMirror::new(),
        HistoryCache::new(100),
    )
}

fn pit_names() -> ProbeNames {
    ProbeNames {
        chamber_name: "Pit".to_string(),
        probe1_name: "Brisket".to_string(),
        probe2_name: "Ribs".to_string(),
        probe3_name: "Sausage".to_string(),
    }
}

#[tokio::test]
async fn n_toggles_broadcast_n_updates_and_flip_parity() {
    for n in 1..=6usize {
        let cloud = MemoryCloud::new();
        let sync = state_sync(&cloud);
        let initial = cloud.current_session().smoking;

        let mut last = SmokingState::from(initial);
        for _ in 0..n {
            last = sync.toggle().await.unwrap();
        }

        assert_eq!(cloud.emitted_named("smokeUpdate").len(), n);
        let expected = initial ^ (n % 2 == 1);
        assert_eq!(cloud.current_session().smoking, expected);
        assert_eq!(last.is_on(), expected);
        assert_eq!(sync.mirror().smoking(), expected);
    }
}

#[tokio::test]
async fn toggle_broadcasts_profile_names() {
    let cloud = MemoryCloud::new();
    cloud.set_probe_names(pit_names());
    let sync = state_sync(&cloud);

    sync.toggle().await.unwrap();

    assert_eq!(
        cloud.emitted_named("smokeUpdate"),
        vec![CloudEvent::SmokeUpdate(SmokeUpdate::new(true, pit_names()))]
    );
}

#[tokio::test]
async fn toggle_without_profile_uses_default_names() {
    let cloud = MemoryCloud::new();
    let sync = state_sync(&cloud);

    sync.toggle().await.unwrap();

    assert_eq!(
        cloud.emitted_named("smokeUpdate"),
        vec![CloudEvent::SmokeUpdate(SmokeUpdate::new(
            true,
            ProbeNames::default()
        ))]
    );
}

#[tokio::test]
async fn toggle_while_disconnected_still_writes() {
    let cloud = MemoryCloud::disconnected();
    let sync = state_sync(&cloud);

    assert_eq!(sync.toggle().await.unwrap(), SmokingState::On);
    assert!(cloud.current_session().smoking);
    assert!(cloud.emitted().is_empty());
}

#[tokio::test]
async fn toggle_fails_when_durable_api_is_down() {
    let cloud = MemoryCloud::new();
    cloud.set_ingest_available(false);
    let sync = state_sync(&cloud);

    assert!(sync.toggle().await.is_err());
    assert!(cloud.emitted().is_empty());
}

#[tokio::test]
async fn clear_drops_cache_but_not_durable_data() {
    let cloud = MemoryCloud::new();
    let sync = state_sync(&cloud);
    cloud
        .post_batch(&[TempRecord::from(&fixtures::reading(225.0, 140.0, 0.0, 0.0, 1))])
        .await
        .unwrap();
    sync.on_refresh().await.unwrap();
    assert_eq!(sync.history().len(), 1);

    sync.handle_event(&CloudEvent::Clear).await;

    assert!(sync.history().is_empty());
    assert_eq!(cloud.records().len(), 1);
}

#[tokio::test]
async fn refresh_reloads_history() {
    let cloud = MemoryCloud::new();
    let sync = state_sync(&cloud);
    sync.history().push(fixtures::reading(1.0, 1.0, 1.0, 1.0, 0));

    cloud
        .post_batch(&[
            TempRecord::from(&fixtures::reading(225.0, 140.0, 0.0, 0.0, 1)),
            TempRecord::from(&fixtures::reading(226.0, 141.0, 0.0, 0.0, 2)),
        ])
        .await
        .unwrap();
    sync.handle_event(&CloudEvent::Refresh).await;

    let chambers: Vec<f64> = sync
        .history()
        .snapshot()
        .iter()
        .map(|reading| reading.chamber_temp)
        .collect();
    assert_eq!(chambers, vec![225.0, 226.0]);
}

#[tokio::test]
async fn inbound_updates_only_touch_the_mirror() {
    let cloud = MemoryCloud::new();
    let sync = state_sync(&cloud);

    let legacy = CloudEvent::decode(r#"{"event":"smokeUpdate","data":true}"#).unwrap();
    sync.handle_event(&legacy).await;

    assert!(sync.mirror().smoking());
    assert!(!cloud.current_session().smoking);
    assert!(cloud.emitted().is_empty());
}

#[tokio::test]
async fn bootstrap_loads_session_names_and_history() {
    let cloud = MemoryCloud::new();
    cloud.set_session(CookingSession {
        session_id: "smoke-7".to_string(),
        smoking: true,
    });
    cloud.set_probe_names(pit_names());
    cloud
        .post_batch(&[TempRecord::from(&fixtures::reading(225.0, 140.0, 0.0, 0.0, 1))])
        .await
        .unwrap();
    let sync = state_sync(&cloud);

    sync.bootstrap().await;

    let state = sync.mirror().state();
    assert_eq!(state.session_id, "smoke-7");
    assert!(state.smoking);
    assert_eq!(state.names, pit_names());
    assert_eq!(sync.history().len(), 1);
}

#[tokio::test]
async fn toggle_reaches_other_displays_through_the_hub() {
    let cloud = MemoryCloud::new();
    let operator = state_sync(&cloud);
    let display = Arc::new(state_sync(&cloud));
    let mut mirror = display.mirror().subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = {
        let display = display.clone();
        tokio::spawn(async move { display.run(shutdown_rx).await })
    };
    tokio::task::yield_now().await;

    operator.toggle().await.unwrap();
    mirror.wait_for(|state| state.smoking).await.unwrap();

    shutdown_tx.send(true).unwrap();
    listener.await.unwrap();
}
