//! Wire protocol for Terrabound.
//!
//! This crate defines what clients and the server exchange:
//!
//! - **Types** ([`Envelope`], [`SystemMessage`], [`MatchData`], etc.):
//!   the structures that travel on the wire.
//! - **Matchmaking payloads** ([`SkillBand`], [`SessionAssignment`]):
//!   shared between the allocator and the connection handler.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   become bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session runtime / Matchmaker
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Channel, Envelope, MatchData, OpCode, Payload, PlayerId, SessionAssignment,
    SessionId, SkillBand, SystemMessage,
};
