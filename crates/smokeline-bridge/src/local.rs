//! Local relay client
//!
//! Subscribes to the sensor host's "temp" channel and feeds the raw payloads
//! into the bridge's inbound queue. Reconnects with backoff whenever the
//! sensor host goes away.

use futures_util::StreamExt;
use reqwest::Url;
use smokeline_core::{LocalMessage, ReconnectConfig};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// Extract the reading payload from one local channel frame.
///
/// Frames that are not envelopes are passed through as raw payloads; envelopes
/// for other events are ignored.
pub fn extract_payload(text: &str) -> Option<String> {
    match LocalMessage::decode(text) {
        Ok(message) if message.is_temp() => Some(message.data),
        Ok(message) => {
            debug!(event = %message.event, "Ignoring local event");
            None
        }
        Err(_) => Some(text.to_string()),
    }
}

/// WebSocket subscriber to the local relay.
#[derive(Debug, Clone)]
pub struct LocalRelayClient {
    url: Url,
    reconnect: ReconnectConfig,
}

impl LocalRelayClient {
    /// Client for the relay at `url`.
    pub fn new(url: &str, reconnect: ReconnectConfig) -> Result<Self, BridgeError> {
        let url = Url::parse(url)
            .map_err(|e| BridgeError::Config(format!("invalid relay URL {url:?}: {e}")))?;
        Ok(Self { url, reconnect })
    }

    /// Forward payloads into `frames` until shutdown or the receiver is dropped.
    pub async fn run(self, frames: mpsc::Sender<String>, mut shutdown: watch::Receiver<bool>) {
        let mut attempt = 0u32;

        while !*shutdown.borrow() {
            match connect_async(self.url.as_str()).await {
                Ok((mut socket, _)) => {
                    attempt = 0;
                    info!(url = %self.url, "Connected to local relay");
                    loop {
                        tokio::select! {
                            message = socket.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    if let Some(payload) = extract_payload(&text) {
                                        if frames.send(payload).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Ok(_)) => {}
                                Some(Err(err)) => {
                                    warn!(error = %err, "Local relay read failed");
                                    break;
                                }
                            },
                            _ = shutdown.changed() => {
                                let _ = socket.close(None).await;
                                return;
                            }
                        }
                    }
                    warn!(url = %self.url, "Local relay connection lost");
                }
                Err(err) => warn!(url = %self.url, error = %err, "Local relay connect failed"),
            }

            attempt = attempt.saturating_add(1);
            let delay = self.reconnect.calculate_backoff_delay(attempt);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.changed() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_payload() {
        let frame = LocalMessage::temp(r#"{"Chamber":1,"Meat":2}"#).encode().unwrap();
        assert_eq!(extract_payload(&frame).as_deref(), Some(r#"{"Chamber":1,"Meat":2}"#));
        assert_eq!(extract_payload(r#"{"event":"hello","data":""}"#), None);
        assert_eq!(extract_payload("bare line").as_deref(), Some("bare line"));
    }
}
