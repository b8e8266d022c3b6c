//! Byte-level connections for Terrabound.
//!
//! The server is written against [`Transport`] (a listener) and
//! [`Connection`] (one client). Nothing here knows about envelopes or
//! sessions: a connection moves opaque frames in both directions.
//!
//! The `websocket` feature (on by default) provides
//! [`WebSocketTransport`].

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of an accepted connection. Used in logs only;
/// players are identified by their authenticated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id. Ids start at 1 and are never reused.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How hard the transport should try to deliver a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    #[default]
    Reliable,
    /// May be dropped or reordered. Transports without a lossy path
    /// deliver these reliably.
    BestEffort,
}

/// A listener handing out connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for the next client and completes any upgrade handshake.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// One client connection.
///
/// All methods take `&self`: a handler can sit in `recv` while session
/// broadcasts are written out through `send`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes one frame.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Writes one frame with the given delivery class.
    fn send_with(
        &self,
        data: &[u8],
        delivery: Delivery,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let _ = delivery;
        self.send(data)
    }

    /// Reads the next frame. `Ok(None)` means the peer closed cleanly.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}
