//! SensorSource emission behavior

use parking_lot::Mutex;
use smokeline_core::{LocalMessage, LocalTemps, SensorFrame};
use smokeline_sensor::{LocalRelay, SensorReadError, SensorSource};
use smokeline_testkit::SteppingClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn recording(source: &SensorSource) -> Arc<Mutex<Vec<SensorFrame>>> {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let sink = frames.clone();
    source.subscribe(move |frame| sink.lock().push(frame.clone()));
    frames
}

#[tokio::test(start_paused = true)]
async fn emulator_emits_every_interval() {
    let source = Arc::new(SensorSource::new(Arc::new(SteppingClock::default())));
    let frames = recording(&source);

    let runner = {
        let source = source.clone();
        tokio::spawn(async move { source.run_emulator(Duration::from_millis(500)).await })
    };
    tokio::time::sleep(Duration::from_millis(1_600)).await;
    source.shutdown();
    runner.await.unwrap();

    let frames = frames.lock();
    assert_eq!(frames.len(), 3);
    let last = LocalTemps::decode(&frames[2].payload).unwrap();
    assert_eq!((last.meat, last.meat2, last.meat3, last.chamber), (3.0, 6.0, 9.0, 12.0));
    assert!(frames[0].received_at < frames[1].received_at);
}

#[tokio::test]
async fn every_subscriber_sees_every_frame_in_order() {
    let source = SensorSource::new(Arc::new(SteppingClock::default()));
    let first = recording(&source);
    let second = recording(&source);

    for payload in ["a", "b", "c"] {
        assert_eq!(source.publish(payload), 2);
    }

    let payloads = |frames: &Arc<Mutex<Vec<SensorFrame>>>| {
        frames
            .lock()
            .iter()
            .map(|frame| frame.payload.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(payloads(&first), vec!["a", "b", "c"]);
    assert_eq!(payloads(&second), payloads(&first));
}

#[tokio::test]
async fn bad_lines_are_skipped_and_anomalies_forwarded() {
    let source = SensorSource::new(Arc::new(SteppingClock::default()));
    let frames = recording(&source);

    let (tx, rx) = mpsc::channel(8);
    tx.send(Ok(r#"{"Chamber":225,"Meat":140}"#.to_string())).await.unwrap();
    tx.send(Err(SensorReadError::new("invalid UTF-8", None))).await.unwrap();
    tx.send(Ok(r#"{"Chamber":225,"Meat":900}"#.to_string())).await.unwrap();
    tx.send(Ok("garbage".to_string())).await.unwrap();
    drop(tx);

    source.run_lines(rx).await;

    let payloads: Vec<String> = frames
        .lock()
        .iter()
        .map(|frame| frame.payload.clone())
        .collect();
    assert_eq!(
        payloads,
        vec![
            r#"{"Chamber":225,"Meat":140}"#.to_string(),
            r#"{"Chamber":225,"Meat":900}"#.to_string(),
            "garbage".to_string(),
        ]
    );
}

#[tokio::test]
async fn relay_forwards_frames_unmodified() {
    let source = SensorSource::new(Arc::new(SteppingClock::default()));
    let relay = LocalRelay::new(8);
    relay.attach(&source);
    let mut rx = relay.subscribe();

    source.publish(r#"{"Chamber":"hot"}"#);

    let message = LocalMessage::decode(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(message.event, "temp");
    assert_eq!(message.data, r#"{"Chamber":"hot"}"#);
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_start_is_honoured() {
    let source = SensorSource::new(Arc::new(SteppingClock::default()));
    let frames = recording(&source);

    source.shutdown();
    tokio::time::timeout(
        Duration::from_secs(2),
        source.run_emulator(Duration::from_millis(50)),
    )
    .await
    .expect("emulator kept running after shutdown");

    assert!(frames.lock().is_empty());
}
