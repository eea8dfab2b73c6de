// Integration tests for the streaming transport against a real local
// websocket server.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use habla::{AudioChunk, DictationError, StreamingTransport, TransportEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn chunk(sequence: u32) -> AudioChunk {
    AudioChunk {
        data: vec![sequence as u8; 64],
        sequence,
        captured_at: Utc::now(),
    }
}

/// Backend double that answers every binary chunk with the next scripted
/// text fragment.
async fn spawn_reply_server(replies: Vec<&'static str>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let replies = replies.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                let mut next = 0;

                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Binary(_) => {
                            if next < replies.len() {
                                ws.send(Message::Text(replies[next].into())).await.ok();
                                next += 1;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    addr
}

/// Backend double that pushes a fragment every few milliseconds without
/// waiting for audio.
async fn spawn_ticker_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                let mut ticker = tokio::time::interval(Duration::from_millis(10));

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if ws.send(Message::Text("tick".into())).await.is_err() {
                                break;
                            }
                        }
                        msg = ws.next() => match msg {
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            _ => {}
                        },
                    }
                }
            });
        }
    });

    addr
}

#[tokio::test]
async fn connect_emits_ready_first() {
    let addr = spawn_reply_server(vec![]).await;
    let (transport, mut events) = StreamingTransport::connect(&format!("ws://{}", addr))
        .await
        .unwrap();

    assert!(matches!(events.recv().await, Some(TransportEvent::Ready)));
    assert!(transport.is_ready());

    transport.close().await;
}

#[tokio::test]
async fn connect_to_dead_endpoint_fails() {
    // Bind and immediately drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = StreamingTransport::connect(&format!("ws://{}", addr)).await;
    assert!(matches!(result, Err(DictationError::ConnectFailed(_))));
}

#[tokio::test]
async fn fragments_are_delivered_in_order() {
    let addr = spawn_reply_server(vec!["uno", "dos", "tres"]).await;
    let (transport, mut events) = StreamingTransport::connect(&format!("ws://{}", addr))
        .await
        .unwrap();

    assert!(matches!(events.recv().await, Some(TransportEvent::Ready)));

    for seq in 0..3 {
        transport.send(chunk(seq));
    }

    let mut received = Vec::new();
    while received.len() < 3 {
        match events.recv().await {
            Some(TransportEvent::Fragment(text)) => received.push(text),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    assert_eq!(received, vec!["uno", "dos", "tres"]);

    transport.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_ends_fragment_delivery() {
    let addr = spawn_ticker_server().await;
    let (transport, mut events) = StreamingTransport::connect(&format!("ws://{}", addr))
        .await
        .unwrap();

    assert!(matches!(events.recv().await, Some(TransportEvent::Ready)));

    // Let a few fragments flow first.
    match events.recv().await {
        Some(TransportEvent::Fragment(_)) => {}
        other => panic!("expected a fragment, got {:?}", other),
    }

    transport.close().await;
    transport.close().await; // second close is a no-op

    assert!(!transport.is_ready());

    // Events buffered before the close may still be in the channel, but the
    // stream must end with Closed and nothing after it.
    let mut saw_closed = false;
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Closed => {
                saw_closed = true;
                break;
            }
            TransportEvent::Fragment(_) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert!(saw_closed);
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn send_after_close_is_dropped_silently() {
    let addr = spawn_reply_server(vec![]).await;
    let (transport, _events) = StreamingTransport::connect(&format!("ws://{}", addr))
        .await
        .unwrap();

    transport.close().await;
    transport.send(chunk(0)); // must not panic or block
}

#[tokio::test]
async fn backend_disconnect_surfaces_connection_lost_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept one connection, then drop it after a short delay.
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let ws = accept_async(stream).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(ws);
        }
    });

    let (_transport, mut events) = StreamingTransport::connect(&format!("ws://{}", addr))
        .await
        .unwrap();

    assert!(matches!(events.recv().await, Some(TransportEvent::Ready)));

    let mut errors = 0;
    let mut closed = 0;
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Error(DictationError::ConnectionLost(_)) => errors += 1,
            TransportEvent::Closed => closed += 1,
            other => panic!("unexpected event: {:?}", other),
        }
    }

    assert_eq!(errors, 1, "connection loss must be reported exactly once");
    assert_eq!(closed, 1);
}
