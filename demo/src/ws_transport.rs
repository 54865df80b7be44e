//! A real [`econn::Transport`] backed by a client WebSocket connection.
//!
//! `Connection`'s operations are synchronous (no suspension points inside a
//! core operation), but sending over a real socket is async. Following
//! `client-rust`'s `TrailsClient`/`ws_task` split: a background task owns
//! the write half and drains an unbounded channel, so `Transport::send`
//! itself never blocks or awaits — it just queues. The read half is kept
//! out of the `Transport` impl entirely and returned to the caller
//! separately (see [`connect`]), so it can be polled directly in the
//! caller's own `tokio::select!` loop without also holding a `&mut`
//! borrow on whatever `Connection` the `WsTransport` is bound into.

use std::fmt;

use econn::{EconnError, Transport};
use futures::stream::{SplitStream, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::warn;

pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

#[derive(Debug)]
pub struct ConnectError(String);

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "websocket connect failed: {}", self.0)
    }
}

impl std::error::Error for ConnectError {}

/// The outbound half of one open WebSocket. The write half lives inside a
/// spawned task; this struct holds only a sender into that task's queue —
/// the read half is returned separately by [`connect`], not stored here.
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<String>,
}

/// Dial `url` and split the resulting socket into a [`WsTransport`] (for
/// `Connection`'s outbound sends) and a [`WsStream`] (for the caller's own
/// read loop).
pub async fn connect(url: &str) -> Result<(WsTransport, WsStream), ConnectError> {
    let (ws, _resp) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| ConnectError(e.to_string()))?;
    let (sink, stream) = ws.split();

    let (outbound, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut sink = sink;
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                warn!(error = %e, "websocket write failed, write task exiting");
                break;
            }
        }
    });

    Ok((WsTransport { outbound }, stream))
}

/// Await the next inbound text/binary frame on `stream`, surfacing its
/// bytes. Returns `None` once the peer closes the socket.
pub async fn recv_frame(stream: &mut WsStream) -> Option<Vec<u8>> {
    loop {
        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => return Some(text.as_bytes().to_vec()),
            Some(Ok(WsMessage::Binary(bytes))) => return Some(bytes),
            Some(Ok(WsMessage::Close(_))) | None => return None,
            Some(Ok(_)) => continue, // ping/pong — tungstenite auto-handles these
            Some(Err(e)) => {
                warn!(error = %e, "websocket read error");
                return None;
            }
        }
    }
}

impl Transport for WsTransport {
    fn send(&mut self, encoded: &str) -> Result<(), EconnError> {
        self.outbound
            .send(encoded.to_string())
            .map_err(|_| EconnError::Send("write task has exited".into()))
    }
}
