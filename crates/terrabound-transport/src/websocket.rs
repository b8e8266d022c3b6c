//! [`Transport`] over WebSocket, via `tokio-tungstenite`.
//!
//! Every frame goes out as a binary message. Inbound text messages are
//! accepted too, since browser clients often send JSON as text.

use std::io::ErrorKind;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

type WsStream = WebSocketStream<TcpStream>;

fn io(kind: ErrorKind, e: tungstenite::Error) -> std::io::Error {
    std::io::Error::new(kind, e)
}

/// Listens for WebSocket upgrades on a TCP socket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds to `addr`. Port 0 picks a free port; read it back with
    /// [`Transport::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::BindFailed {
                addr: addr.to_owned(),
                source,
            })?;
        tracing::info!(addr, "listening for websocket clients");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let upgraded = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(|e| TransportError::AcceptFailed(io(ErrorKind::ConnectionRefused, e)))?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "websocket upgrade complete");

        let (writer, reader) = upgraded.split();
        Ok(WebSocketConnection {
            id,
            peer,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::AcceptFailed)
    }
}

/// One upgraded client.
///
/// Reader and writer halves are locked separately.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Binary(data.to_vec().into()))
            .await
            .map_err(|e| TransportError::SendFailed(io(ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        while let Some(next) = reader.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(tungstenite::Error::ConnectionClosed) => return Ok(None),
                Err(e) => {
                    return Err(TransportError::ReceiveFailed(io(ErrorKind::ConnectionReset, e)));
                }
            };
            match msg {
                Message::Binary(bytes) => return Ok(Some(bytes.to_vec())),
                Message::Text(text) => return Ok(Some(text.as_str().as_bytes().to_vec())),
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings on its own.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Frame(_) => return Err(TransportError::UnexpectedFrame { peer: self.peer }),
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self.writer.lock().await.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(io(ErrorKind::BrokenPipe, e))),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
