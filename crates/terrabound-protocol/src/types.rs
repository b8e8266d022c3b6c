//! Core protocol types for Terrabound's wire format.
//!
//! Everything in this module is serialized, sent over the network, and
//! deserialized by a game client. Field names and tags are part of the
//! contract with the client; the tests at the bottom pin them down.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable, opaque player identifier issued by the account system.
///
/// Serialized as a plain JSON string (`"user-42"`, not `{"0":"user-42"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is the empty string.
    ///
    /// An empty identity is treated the same as a missing one.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one running session (one game world instance).
///
/// Assigned when the session runtime is created and used as the key of
/// its registry record. Globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Op codes and match data
// ---------------------------------------------------------------------------

/// Numeric discriminator for application-level match messages.
///
/// Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpCode(pub i64);

impl OpCode {
    /// The full per-tick player snapshot broadcast by a session runtime.
    pub const STATE_SNAPSHOT: OpCode = OpCode(1);
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// An application-level message exchanged with a session runtime.
///
/// Client → server: an input (e.g. a position update) tagged with the
/// client's op code. Server → client: a broadcast, e.g. the state
/// snapshot under [`OpCode::STATE_SNAPSHOT`]. `data` is opaque to this
/// layer; only the session logic interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchData {
    pub op_code: OpCode,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Channel: delivery guarantees
// ---------------------------------------------------------------------------

/// Delivery guarantee requested for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss. Used for snapshots and all
    /// system traffic.
    #[default]
    ReliableOrdered,

    /// May be dropped. Transports without an unreliable path fall back
    /// to reliable delivery.
    Unreliable,
}

// ---------------------------------------------------------------------------
// Matchmaking payloads
// ---------------------------------------------------------------------------

/// Inclusive range of skill ratings a session accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBand {
    pub min: i32,
    pub max: i32,
}

impl SkillBand {
    /// A band of `range` on either side of `rating`.
    ///
    /// Saturates at the `i32` bounds instead of wrapping.
    pub fn around(rating: i32, range: i32) -> Self {
        Self {
            min: rating.saturating_sub(range),
            max: rating.saturating_add(range),
        }
    }

    /// Centre of the band. Computed in `f64` so extreme bounds don't
    /// overflow.
    pub fn midpoint(&self) -> f64 {
        (f64::from(self.min) + f64::from(self.max)) / 2.0
    }

    /// Distance from `rating` to the centre of the band.
    pub fn distance_to(&self, rating: i32) -> f64 {
        (f64::from(rating) - self.midpoint()).abs()
    }
}

/// The answer to a session request: which session to join, plus its
/// skill band and occupancy as recorded in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAssignment {
    pub session_id: SessionId,
    pub min_skill: i32,
    pub max_skill: i32,
    pub current_players: i32,
    pub max_players: i32,
    /// Server wall clock, seconds since the Unix epoch.
    pub server_time: i64,
}

// ---------------------------------------------------------------------------
// SystemMessage: framework-level messages
// ---------------------------------------------------------------------------

/// Messages handled by the server itself rather than by session logic.
///
/// Internally tagged: `{ "type": "JoinSession", "session_id": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server: protocol version and an identity token.
    Handshake { version: u32, token: Option<String> },

    /// Server → Client: the authenticated identity.
    HandshakeAck { player_id: PlayerId, server_time: u64 },

    /// Either direction: the connection is closing.
    Disconnect { reason: String },

    // -- Heartbeat --
    /// Client → Server keep-alive with the client's clock.
    Heartbeat { client_time: u64 },

    /// Server → Client echo, for RTT and clock-offset estimation.
    HeartbeatAck { client_time: u64, server_time: u64 },

    // -- Matchmaking --
    /// Client → Server: "find me a session". The skill rating comes
    /// from the caller's account, not from the request.
    RequestSession,

    /// Server → Client: the allocator's answer.
    SessionAssigned(SessionAssignment),

    // -- Session membership --
    /// Client → Server: connect this transport to a session.
    JoinSession { session_id: SessionId },

    /// Server → Client: the join was accepted.
    SessionJoined { session_id: SessionId },

    /// Client → Server: leave the current session.
    LeaveSession,

    // -- Errors --
    /// Server → Client: a request failed. `code` follows HTTP
    /// conventions (401 unauthenticated, 404 not found, 409 conflict…).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Payload and Envelope
// ---------------------------------------------------------------------------

/// Either a system message or match data for the player's session.
///
/// Adjacently tagged:
/// `{ "type": "Match", "data": { "op_code": 1, "data": [...] } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    Match(MatchData),
}

/// The top-level frame. Every message on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,

    /// Delivery guarantee. Defaults to `ReliableOrdered` when absent.
    #[serde(default)]
    pub channel: Channel,

    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================
