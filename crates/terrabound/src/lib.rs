//! # Terrabound
//!
//! Authoritative multiplayer session server.
//!
//! Clients connect over WebSocket, authenticate in a handshake, ask the
//! matchmaker for a session that fits their skill rating, and join it.
//! Each session is a tick-driven actor that replicates player positions
//! to everyone in it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use terrabound::prelude::*;
//!
//! # async fn run() -> Result<(), TerraboundError> {
//! let server = TerraboundServerBuilder::new()
//!     .bind("0.0.0.0:7350")
//!     .build(
//!         DevAuthenticator,
//!         Arc::new(InMemoryRegistry::new()),
//!         Arc::new(InMemoryAccountStore::new()),
//!     )
//!     .await?;
//! server.run().await
//! # }
//! ```

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod spawner;

pub use auth::{AuthError, Authenticator, DevAuthenticator};
pub use config::ServerConfig;
pub use error::TerraboundError;
pub use server::{PROTOCOL_VERSION, TerraboundServer, TerraboundServerBuilder};
pub use spawner::LocalSessionSpawner;

pub mod prelude {
    pub use crate::{
        AuthError, Authenticator, DevAuthenticator, LocalSessionSpawner, PROTOCOL_VERSION,
        ServerConfig, TerraboundError, TerraboundServer, TerraboundServerBuilder,
    };
    pub use terrabound_matchmaker::{
        AccountStore, AllocatorConfig, InMemoryAccountStore, InMemoryRegistry, MatchmakerError,
        SessionRegistry,
    };
    pub use terrabound_protocol::{
        Channel, Envelope, MatchData, OpCode, Payload, PlayerId, SessionAssignment, SessionId,
        SystemMessage,
    };
    pub use terrabound_session::{MovementLogic, SessionConfig, SessionError};
    pub use terrabound_tick::TickPolicy;
}
