//! WebSocket transport for the client.
//!
//! Provides [`ConnectedClient`] which moves text frames between channels and
//! a WebSocket. This is a thin layer that just sends and receives frames;
//! protocol logic remains in the Sans-IO [`crate::Session`].

use futures::{SinkExt, StreamExt};
use parley_proto::{OutboundEvent, ProtocolError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Capacity of the frame channels in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The connection task has stopped.
    #[error("connection closed")]
    Closed,

    /// Outbound event could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Handle to a connected WebSocket.
///
/// Text frames are sent and received via the channels; an internal task
/// handles the socket I/O. `from_server` closes when the server goes away.
pub struct ConnectedClient {
    /// Send text frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive text frames from the server.
    pub from_server: mpsc::Receiver<String>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Encode and queue an outbound event.
    pub async fn send(&self, event: &OutboundEvent) -> Result<(), TransportError> {
        let text = event.encode()?;
        self.to_server.send(text).await.map_err(|_| TransportError::Closed)
    }

    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedClient {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Connect to a Parley server at a `ws://` URL.
///
/// Returns a [`ConnectedClient`] with channels for frame transport.
pub async fn connect(url: &str) -> Result<ConnectedClient, TransportError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_connection(ws_stream, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and the socket.
///
/// Reading runs as its own task so a full inbound channel never stalls
/// outbound frames. The connection ends when either direction stops.
async fn run_connection<S>(
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<String>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_write, ws_read) = ws_stream.split();

    let mut reader = tokio::spawn(read_frames(ws_read, from_server));
    let _reader_guard = AbortOnDrop(reader.abort_handle());

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(text) = outgoing else {
                    let _ = ws_write.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                    warn!(error = %e, "websocket send failed");
                    break;
                }
            },
            _ = &mut reader => break,
        }
    }
}

/// Forward text frames from the socket until it closes or the receiver
/// goes away.
async fn read_frames<S>(
    mut ws_read: futures::stream::SplitStream<tokio_tungstenite::WebSocketStream<S>>,
    from_server: mpsc::Sender<String>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(incoming) = ws_read.next().await {
        match incoming {
            Ok(Message::Text(text)) => {
                if from_server.send(text.as_str().to_string()).await.is_err() {
                    return;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {},
            Err(e) => {
                warn!(error = %e, "websocket receive failed");
                return;
            },
        }
    }
    debug!("websocket closed by server");
}

/// Aborts the reader task when the connection task ends or is aborted.
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
