use crate::audio::AudioChunk;
use crate::error::DictationError;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Lifecycle and data events delivered to the single transport consumer,
/// in arrival order, exactly once each.
#[derive(Debug)]
pub enum TransportEvent {
    /// The backend accepted the connection; sending is allowed from here on.
    Ready,
    /// One transcribed text fragment from the backend.
    Fragment(String),
    /// The connection failed. Reported once; never retried here.
    Error(DictationError),
    /// The connection is gone, gracefully or not. Always the last event.
    Closed,
}

/// One bidirectional streaming connection to the transcription backend.
///
/// Owns the websocket exclusively: outbound audio chunks go out as binary
/// messages through an internal queue, inbound text messages surface as
/// `TransportEvent::Fragment`s. At most one of these exists per session.
pub struct StreamingTransport {
    outbound_tx: mpsc::Sender<AudioChunk>,
    ready: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    close_notify: Arc<Notify>,
    socket_task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingTransport {
    /// Connect to the streaming endpoint.
    ///
    /// On success the returned event channel starts with `Ready`; everything
    /// after that is fragments and lifecycle events from the socket task.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), DictationError> {
        info!("Connecting to streaming endpoint {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| DictationError::ConnectFailed(e.to_string()))?;

        info!("Streaming transport connected");

        let (event_tx, event_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel::<AudioChunk>(64);

        let ready = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(AtomicBool::new(false));
        let close_notify = Arc::new(Notify::new());

        // The channel is freshly created, this cannot block.
        let _ = event_tx.send(TransportEvent::Ready).await;

        let task = tokio::spawn(socket_loop(
            ws_stream,
            outbound_rx,
            event_tx,
            Arc::clone(&ready),
            Arc::clone(&closed),
            Arc::clone(&close_notify),
        ));

        Ok((
            Self {
                outbound_tx,
                ready,
                closed,
                close_notify,
                socket_task: Mutex::new(Some(task)),
            },
            event_rx,
        ))
    }

    /// Queue a chunk for sending. Never blocks; chunks are dropped with a
    /// log line when the connection is not ready or the queue is full.
    pub fn send(&self, chunk: AudioChunk) {
        if !self.ready.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
            warn!(
                "Dropping audio chunk seq={}: transport not ready",
                chunk.sequence
            );
            return;
        }

        if let Err(e) = self.outbound_tx.try_send(chunk) {
            warn!("Dropping audio chunk: outbound queue unavailable ({})", e);
        }
    }

    /// Graceful shutdown. Idempotent. After this returns no new `Fragment`
    /// events are produced and the event stream ends with `Closed`;
    /// fragments already buffered in the event channel can still be
    /// received, anything later on the socket is discarded silently.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("transport already closed");
            return;
        }

        self.ready.store(false, Ordering::SeqCst);
        self.close_notify.notify_one();

        if let Some(task) = self.socket_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Socket task panicked: {}", e);
            }
        }

        info!("Streaming transport closed");
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }
}

async fn socket_loop(
    ws_stream: WsStream,
    mut outbound_rx: mpsc::Receiver<AudioChunk>,
    event_tx: mpsc::Sender<TransportEvent>,
    ready: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    close_notify: Arc<Notify>,
) {
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            chunk = outbound_rx.recv() => match chunk {
                Some(chunk) => {
                    let seq = chunk.sequence;
                    let size = chunk.size_bytes();
                    if let Err(e) = ws_tx.send(Message::Binary(chunk.data.into())).await {
                        ready.store(false, Ordering::SeqCst);
                        if !closed.swap(true, Ordering::SeqCst) {
                            error!("Websocket send failed: {}", e);
                            let _ = event_tx
                                .send(TransportEvent::Error(DictationError::ConnectionLost(
                                    e.to_string(),
                                )))
                                .await;
                        }
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        break;
                    }
                    debug!("Sent audio chunk seq={} ({} bytes)", seq, size);
                }
                // All senders dropped: the transport handle itself is gone.
                None => {
                    ready.store(false, Ordering::SeqCst);
                    let _ = ws_tx.close().await;
                    let _ = event_tx.send(TransportEvent::Closed).await;
                    break;
                }
            },

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if closed.load(Ordering::SeqCst) {
                        debug!("Discarding late fragment after close");
                        continue;
                    }
                    if event_tx
                        .send(TransportEvent::Fragment(text.as_str().to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    ready.store(false, Ordering::SeqCst);
                    if !closed.swap(true, Ordering::SeqCst) {
                        warn!("Backend closed the connection");
                        let _ = event_tx
                            .send(TransportEvent::Error(DictationError::ConnectionLost(
                                "backend closed the connection".to_string(),
                            )))
                            .await;
                    }
                    let _ = event_tx.send(TransportEvent::Closed).await;
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    ready.store(false, Ordering::SeqCst);
                    if !closed.swap(true, Ordering::SeqCst) {
                        error!("Websocket error: {}", e);
                        let _ = event_tx
                            .send(TransportEvent::Error(DictationError::ConnectionLost(
                                e.to_string(),
                            )))
                            .await;
                    }
                    let _ = event_tx.send(TransportEvent::Closed).await;
                    break;
                }
            },

            _ = close_notify.notified() => {
                ready.store(false, Ordering::SeqCst);
                let _ = ws_tx.close().await;
                let _ = event_tx.send(TransportEvent::Closed).await;
                break;
            }
        }
    }

    debug!("socket task finished");
}
