//! `TerraboundServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → matchmaker and
//! session runtimes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use terrabound_matchmaker::{AccountStore, Allocator, SessionRegistry, SystemClock};
use terrabound_protocol::JsonCodec;
use terrabound_session::{MovementLogic, SessionConfig, SessionManager};
use terrabound_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{Authenticator, LocalSessionSpawner, ServerConfig, TerraboundError};

/// The protocol version clients must send in their handshake.
pub const PROTOCOL_VERSION: u32 = 1;

pub(crate) type ServerAllocator<R, A> = Allocator<R, A, LocalSessionSpawner, SystemClock>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<Au, R, A> {
    pub(crate) sessions: Arc<Mutex<SessionManager<MovementLogic>>>,
    pub(crate) allocator: ServerAllocator<R, A>,
    pub(crate) auth: Au,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Terrabound server.
pub struct TerraboundServerBuilder {
    config: ServerConfig,
}

impl TerraboundServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_owned();
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Binds the listener and wires the allocator to a fresh session
    /// manager.
    pub async fn build<Au, R, A>(
        self,
        auth: Au,
        registry: R,
        accounts: A,
    ) -> Result<TerraboundServer<Au, R, A>, TerraboundError>
    where
        Au: Authenticator,
        R: SessionRegistry + 'static,
        A: AccountStore + 'static,
    {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let sessions = Arc::new(Mutex::new(SessionManager::new(self.config.session.clone())));
        let allocator = Allocator::new(
            registry,
            accounts,
            LocalSessionSpawner::new(Arc::clone(&sessions)),
            SystemClock,
            self.config.allocator.clone(),
        );

        let state = Arc::new(ServerState {
            sessions,
            allocator,
            auth,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(TerraboundServer { transport, state })
    }
}

impl Default for TerraboundServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Terrabound server, made by [`TerraboundServerBuilder::build`].
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TerraboundServer<Au, R, A> {
    transport: WebSocketTransport,
    state: Arc<ServerState<Au, R, A>>,
}

impl<Au, R, A> TerraboundServer<Au, R, A>
where
    Au: Authenticator,
    R: SessionRegistry + 'static,
    A: AccountStore + 'static,
{
    pub fn local_addr(&self) -> Result<SocketAddr, TerraboundError> {
        Ok(self.transport.local_addr()?)
    }

    /// The session manager every connection shares.
    pub fn sessions(&self) -> Arc<Mutex<SessionManager<MovementLogic>>> {
        Arc::clone(&self.state.sessions)
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own handler task.
    pub async fn run(mut self) -> Result<(), TerraboundError> {
        tracing::info!(addr = %self.state.config.bind_addr, "Terrabound server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
