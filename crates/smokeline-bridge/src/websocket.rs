//! WebSocket cloud channel
//!
//! Keeps one connection to the cloud hub open, reconnecting with exponential
//! backoff. Frames are JSON `{"event", "data"}` envelopes in both directions.
//! The link state flips to Connected after each successful handshake and back
//! to Disconnected as soon as the connection drops.
//!
//! [`CloudChannel::emit`] resolves only once the frame has been written to the
//! socket. Frames still queued when the connection drops are rejected back to
//! their callers with [`CloudError::NotConnected`], never silently discarded.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use reqwest::Url;
use smokeline_core::{
    CloudChannel, CloudConfig, CloudError, CloudEvent, LinkState, ReconnectConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const OUTBOUND_BUFFER: usize = 64;
const INBOUND_BUFFER: usize = 256;

type CloudSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SendAck = oneshot::Sender<Result<(), CloudError>>;

/// One queued frame and the caller waiting on it.
struct Outbound {
    text: String,
    ack: SendAck,
}

/// Cloud channel over a reconnecting WebSocket.
#[derive(Debug)]
pub struct WsCloudChannel {
    link: Arc<watch::Sender<LinkState>>,
    outbound: mpsc::Sender<Outbound>,
    inbound: broadcast::Sender<CloudEvent>,
    send_timeout: Duration,
    close: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsCloudChannel {
    /// Start connecting to `config.channel_url` in the background.
    pub fn connect(
        config: &CloudConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, CloudError> {
        let url = Url::parse(&config.channel_url)
            .map_err(|e| CloudError::ConnectionFailed(format!("invalid channel URL: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(CloudError::ConnectionFailed(format!(
                "channel URL must be ws:// or wss://, got {url}"
            )));
        }

        let (link, _) = watch::channel(LinkState::Disconnected);
        let link = Arc::new(link);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (inbound, _) = broadcast::channel(INBOUND_BUFFER);
        let (close, close_rx) = watch::channel(false);

        let connection = Connection {
            url,
            connect_timeout: config.timeout(),
            reconnect: config.reconnect.clone(),
            link: link.clone(),
            inbound: inbound.clone(),
            stop: StopSignal {
                shutdown,
                close: close_rx,
            },
        };
        let task = tokio::spawn(connection.run(outbound_rx));

        Ok(Self {
            link,
            outbound,
            inbound,
            send_timeout: config.timeout(),
            close,
            task: Mutex::new(Some(task)),
        })
    }

    /// Whether the background connection task has ended.
    pub fn is_finished(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Write out every queued frame, close the socket and wait for the
    /// connection task to end.
    pub async fn close(&self) {
        self.close.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "Cloud channel task panicked");
                }
            }
        }
    }
}

impl Drop for WsCloudChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[async_trait]
impl CloudChannel for WsCloudChannel {
    fn link_state(&self) -> watch::Receiver<LinkState> {
        self.link.subscribe()
    }

    async fn emit(&self, event: CloudEvent) -> Result<(), CloudError> {
        if !self.link.borrow().is_connected() {
            return Err(CloudError::NotConnected);
        }
        let text = event.encode()?;
        let (ack, written) = oneshot::channel();
        self.outbound
            .send(Outbound { text, ack })
            .await
            .map_err(|_| CloudError::SendFailed {
                reason: "connection task stopped".to_string(),
            })?;

        match timeout(self.send_timeout, written).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CloudError::SendFailed {
                reason: "connection task stopped".to_string(),
            }),
            Err(_) => Err(CloudError::SendFailed {
                reason: format!(
                    "frame not written within {}ms",
                    self.send_timeout.as_millis()
                ),
            }),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<CloudEvent> {
        self.inbound.subscribe()
    }
}

/// Process shutdown plus this channel's own `close`.
struct StopSignal {
    shutdown: watch::Receiver<bool>,
    close: watch::Receiver<bool>,
}

impl StopSignal {
    fn is_set(&self) -> bool {
        *self.shutdown.borrow() || *self.close.borrow()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.shutdown.changed() => {}
            _ = self.close.changed() => {}
        }
    }
}

struct Connection {
    url: Url,
    connect_timeout: Duration,
    reconnect: ReconnectConfig,
    link: Arc<watch::Sender<LinkState>>,
    inbound: broadcast::Sender<CloudEvent>,
    stop: StopSignal,
}

impl Connection {
    async fn run(mut self, mut outbound: mpsc::Receiver<Outbound>) {
        let mut attempt = 0u32;

        while !self.stop.is_set() {
            match timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
                Ok(Ok((socket, _response))) => {
                    attempt = 0;
                    // Enqueued after the previous socket dropped: never had a live link.
                    reject_pending(&mut outbound);
                    self.link.send_replace(LinkState::Connected);
                    info!(url = %self.url, "Cloud channel connected");

                    let stopped = self.pump(socket, &mut outbound).await;
                    self.link.send_replace(LinkState::Disconnected);
                    reject_pending(&mut outbound);
                    if stopped {
                        break;
                    }
                    warn!(url = %self.url, "Cloud channel disconnected");
                }
                Ok(Err(err)) => {
                    warn!(url = %self.url, error = %err, "Cloud channel connect failed");
                }
                Err(_) => warn!(
                    url = %self.url,
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "Cloud channel connect timed out"
                ),
            }

            attempt = attempt.saturating_add(1);
            let delay = self.reconnect.calculate_backoff_delay(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = self.stop.changed() => break,
            }
        }

        self.link.send_replace(LinkState::Disconnected);
        reject_pending(&mut outbound);
        debug!("Cloud channel task stopped");
    }

    /// Move frames until the socket drops (false) or a stop is requested (true).
    async fn pump(
        &mut self,
        socket: CloudSocket,
        outbound: &mut mpsc::Receiver<Outbound>,
    ) -> bool {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                Some(frame) = outbound.recv() => {
                    let result = sink.send(Message::Text(frame.text)).await;
                    let failed = result.is_err();
                    let _ = frame.ack.send(result.map_err(|err| {
                        warn!(error = %err, "Cloud channel send failed");
                        CloudError::SendFailed {
                            reason: err.to_string(),
                        }
                    }));
                    if failed {
                        return false;
                    }
                }
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => match CloudEvent::decode(&text) {
                        Ok(event) => {
                            let _ = self.inbound.send(event);
                        }
                        Err(err) => debug!(error = %err, "Ignoring unrecognised cloud frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => return false,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "Cloud channel read failed");
                        return false;
                    }
                },
                _ = self.stop.changed() => {
                    while let Ok(frame) = outbound.try_recv() {
                        let result = sink.send(Message::Text(frame.text)).await;
                        let _ = frame.ack.send(result.map_err(|err| CloudError::SendFailed {
                            reason: err.to_string(),
                        }));
                    }
                    let _ = sink.send(Message::Close(None)).await;
                    return true;
                }
            }
        }
    }
}

/// Fail every queued frame back to its caller.
fn reject_pending(outbound: &mut mpsc::Receiver<Outbound>) {
    let mut rejected = 0usize;
    while let Ok(frame) = outbound.try_recv() {
        let _ = frame.ack.send(Err(CloudError::NotConnected));
        rejected += 1;
    }
    if rejected > 0 {
        debug!(rejected, "Rejected frames queued without a connection");
    }
}
