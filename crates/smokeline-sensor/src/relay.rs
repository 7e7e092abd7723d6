//! LocalRelay
//!
//! Republishes every frame on the local "temp" channel to the display clients
//! connected at that instant. There is no queue beyond the per-client buffer
//! of the underlying broadcast channel and no replay: a client that connects
//! later starts with the next frame, and a client that falls behind skips
//! ahead instead of slowing anyone down.

use futures_util::{SinkExt, StreamExt};
use smokeline_core::{LocalMessage, RelayConfig, SensorFrame, SubscriptionId};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::SensorError;
use crate::source::SensorSource;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fan-out of encoded local channel messages.
#[derive(Debug, Clone)]
pub struct LocalRelay {
    frames: broadcast::Sender<String>,
}

impl LocalRelay {
    /// Relay buffering up to `capacity` frames per client.
    pub fn new(capacity: usize) -> Self {
        let (frames, _) = broadcast::channel(capacity.max(1));
        Self { frames }
    }

    /// Relay sized from configuration.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Publish one frame on the "temp" channel. Returns how many clients got it.
    pub fn publish(&self, frame: &SensorFrame) -> usize {
        let text = match LocalMessage::temp(frame.payload.as_str()).encode() {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Failed to encode local frame");
                return 0;
            }
        };
        // A send error only means nobody is listening.
        self.frames.send(text).unwrap_or(0)
    }

    /// Republish everything `source` emits.
    pub fn attach(&self, source: &SensorSource) -> SubscriptionId {
        let relay = self.clone();
        source.subscribe(move |frame| {
            relay.publish(frame);
        })
    }

    /// In-process subscription to encoded frames.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.frames.subscribe()
    }

    /// Number of connected clients, including in-process subscribers.
    pub fn client_count(&self) -> usize {
        self.frames.receiver_count()
    }

    /// Bind the WebSocket listener.
    pub async fn bind(addr: &str) -> Result<TcpListener, SensorError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Local relay listening");
        Ok(listener)
    }

    /// Accept display clients until `shutdown` flips.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SensorError> {
        if *shutdown.borrow() {
            return Ok(());
        }
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let relay = self.clone();
                        let client_shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            let served = relay.serve_client(stream, peer, client_shutdown).await;
                            if let Err(err) = served {
                                debug!(%peer, error = %err, "Display client ended with error");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "Failed to accept display client"),
                },
                _ = shutdown.changed() => {
                    info!("Local relay stopped");
                    return Ok(());
                }
            }
        }
    }

    async fn serve_client(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SensorError> {
        let ws = timeout(HANDSHAKE_TIMEOUT, accept_async(stream))
            .await
            .map_err(|_| SensorError::relay(format!("handshake with {peer} timed out")))?
            .map_err(|e| SensorError::relay(format!("handshake with {peer} failed: {e}")))?;
        let (mut sink, mut incoming) = ws.split();
        let mut frames = self.frames.subscribe();
        info!(%peer, "Display client connected");

        loop {
            tokio::select! {
                frame = frames.recv() => match frame {
                    Ok(text) => {
                        sink.send(Message::Text(text)).await.map_err(|e| {
                            SensorError::relay(format!("send to {peer} failed: {e}"))
                        })?;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        debug!(%peer, missed, "Display client lagging, frames skipped");
                    }
                    Err(RecvError::Closed) => break,
                },
                message = incoming.next() => match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        return Err(SensorError::relay(format!("read from {peer} failed: {err}")));
                    }
                },
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        info!(%peer, "Display client disconnected");
        Ok(())
    }
}
