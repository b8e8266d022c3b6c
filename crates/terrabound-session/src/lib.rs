//! Authoritative session runtimes for Terrabound.
//!
//! A session is one running game world. Each one lives in its own Tokio
//! task (actor model): it owns its [`SessionState`], advances it once
//! per tick, and is the only thing that ever touches it. The outside
//! world talks to it through a [`SessionHandle`].
//!
//! # Key types
//!
//! - [`SessionLogic`]: lifecycle hooks a game mode implements
//! - [`MovementLogic`]: the position-replication mode the server runs
//! - [`SessionManager`]: creates runtimes and routes players to them
//! - [`SessionHandle`]: sends commands to one running actor
//! - [`RuntimeState`]: Created → Running → Terminated
//! - [`SessionConfig`]: channel size, tick policy, jitter

mod config;
mod error;
mod logic;
mod manager;
mod movement;
mod runtime;
mod state;

pub use config::{RuntimeState, SessionConfig};
pub use error::SessionError;
pub use logic::{Broadcast, ClientInput, Initialized, JoinDecision, SessionLogic};
pub use manager::SessionManager;
pub use movement::{MOVEMENT_LABEL, MOVEMENT_TICK_RATE, MovementLogic, MovementParams};
pub use runtime::{Outbound, PlayerSender, SessionHandle, SessionInfo};
pub use state::{PlayerSnapshot, PositionUpdate, SessionState};
