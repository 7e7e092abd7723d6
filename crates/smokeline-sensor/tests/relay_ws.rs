//! LocalRelay over a real WebSocket

use futures_util::StreamExt;
use smokeline_core::{LocalMessage, SensorFrame};
use smokeline_sensor::LocalRelay;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};

async fn wait_for_clients(relay: &LocalRelay, count: usize) {
    for _ in 0..200 {
        if relay.client_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("clients never connected");
}

#[tokio::test]
async fn connected_clients_receive_temp_frames() {
    let relay = LocalRelay::new(8);
    let listener = LocalRelay::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.serve(listener, shutdown_rx).await })
    };

    // Published before anyone connected: lost.
    assert_eq!(relay.publish(&SensorFrame::new("early", chrono::Utc::now())), 0);

    let (mut first, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    wait_for_clients(&relay, 2).await;

    let payload = r#"{"Chamber":225,"Meat":140,"Meat2":150,"Meat3":160}"#;
    assert_eq!(relay.publish(&SensorFrame::new(payload, chrono::Utc::now())), 2);

    for client in [&mut first, &mut second] {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let Message::Text(text) = frame else {
            panic!("expected text frame, got {frame:?}");
        };
        let message = LocalMessage::decode(&text).unwrap();
        assert!(message.is_temp());
        assert_eq!(message.data, payload);
    }

    shutdown_tx.send(true).unwrap();
    server.await.unwrap().unwrap();
}
