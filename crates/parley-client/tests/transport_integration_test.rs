//! Integration tests for the client WebSocket transport.
//!
//! These tests connect a real [`ConnectedClient`] to a minimal WebSocket
//! server on localhost and drive a session through it.

#![cfg(feature = "transport")]
#![allow(clippy::unwrap_used)]

use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use parley_client::{
    Identity, Room, Session, SessionAction, SessionConfig, SessionEvent,
    transport::{self, ConnectedClient},
};
use parley_proto::{
    InboundEvent, MessageId, OutboundEvent,
    payloads::{
        private::MessageSeen,
        room::{History, SystemNotice},
    },
};
use tokio::{
    net::TcpListener,
    sync::oneshot,
    time::timeout,
};
use tokio_tungstenite::tungstenite::Message;

/// Start a server that answers `join` with an empty history and then closes.
async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else { continue };
            if let Ok(OutboundEvent::Join(_)) = OutboundEvent::decode(text.as_str()) {
                let reply = InboundEvent::History(History { messages: Vec::new() });
                ws.send(Message::Text(reply.encode().unwrap().into())).await.unwrap();
                ws.close(None).await.unwrap();
                break;
            }
        }
    });

    format!("ws://{addr}")
}

async fn recv(client: &mut ConnectedClient) -> Option<String> {
    timeout(Duration::from_secs(5), client.from_server.recv()).await.unwrap()
}

#[tokio::test]
async fn join_round_trip() {
    let url = start_server().await;
    let mut client = transport::connect(&url).await.unwrap();
    let mut session: Session<Instant> = Session::new(
        Identity::new("alice").unwrap(),
        Room::new("General").unwrap(),
        SessionConfig::default(),
    );

    for action in session.handle(SessionEvent::Connected).unwrap() {
        if let SessionAction::Send(event) = action {
            client.send(&event).await.unwrap();
        }
    }

    let text = recv(&mut client).await.unwrap();
    let actions = session.handle(SessionEvent::Received(text)).unwrap();
    assert!(matches!(actions.as_slice(), [SessionAction::Render(_)]));

    // Server closed after replying.
    assert_eq!(recv(&mut client).await, None);
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(transport::connect(&format!("ws://{addr}")).await.is_err());
}

/// Start a server that floods `frames` notices while counting what it reads.
///
/// The count is reported once `frames` client frames have arrived.
async fn start_flooding_server(frames: usize) -> (String, oneshot::Receiver<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut write, mut read) = ws.split();

        tokio::spawn(async move {
            for n in 0..frames {
                let notice = InboundEvent::System(SystemNotice { msg: format!("notice {n}") });
                if write.send(Message::Text(notice.encode().unwrap().into())).await.is_err() {
                    return;
                }
            }
        });

        let mut received = 0;
        while let Some(Ok(message)) = read.next().await {
            if matches!(message, Message::Text(_)) {
                received += 1;
                if received == frames {
                    break;
                }
            }
        }
        let _ = done_tx.send(received);
    });

    (format!("ws://{addr}"), done_rx)
}

#[tokio::test]
async fn outbound_burst_is_not_blocked_by_unread_inbound() {
    const FRAMES: usize = 200;
    let (url, done) = start_flooding_server(FRAMES).await;
    let mut client = transport::connect(&url).await.unwrap();

    // Let the flood fill the inbound channel before sending anything.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let burst = async {
        for n in 0..FRAMES as u64 {
            let ack = OutboundEvent::MessageSeen(MessageSeen {
                id: MessageId::Number(n),
                sender: Identity::new("bob").unwrap(),
            });
            client.send(&ack).await.unwrap();
        }
    };
    timeout(Duration::from_secs(5), burst).await.unwrap();

    let received = timeout(Duration::from_secs(5), done).await.unwrap().unwrap();
    assert_eq!(received, FRAMES);

    // Everything the server flooded is still delivered in order.
    for n in 0..FRAMES {
        let text = recv(&mut client).await.unwrap();
        let expected = InboundEvent::System(SystemNotice { msg: format!("notice {n}") });
        assert_eq!(InboundEvent::decode(&text).unwrap(), expected);
    }
}
