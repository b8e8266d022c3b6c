//! The `SessionLogic` trait: the game-mode extension point.
//!
//! A session runtime owns the actor, the tick cadence and the fan-out to
//! players. Everything game-specific sits behind these hooks, which the
//! runtime calls one at a time from its own task.

use std::collections::HashMap;
use std::time::Duration;

use terrabound_protocol::{Channel, OpCode, PlayerId};

/// What `init` hands back to the runtime.
#[derive(Debug)]
pub struct Initialized<S> {
    /// The freshly created session state.
    pub state: S,
    /// Ticks per second for this session.
    pub tick_rate: u32,
    /// Human-readable label, e.g. for listings.
    pub label: String,
}

/// Outcome of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDecision {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl JoinDecision {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// One raw input received from a player since the previous tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInput {
    pub sender: PlayerId,
    pub op_code: OpCode,
    pub data: Vec<u8>,
}

/// A message the logic wants delivered to every player in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub op_code: OpCode,
    pub channel: Channel,
    pub data: Vec<u8>,
}

impl Broadcast {
    /// A broadcast on the reliable, ordered channel.
    pub fn reliable(op_code: OpCode, data: Vec<u8>) -> Self {
        Self {
            op_code,
            channel: Channel::ReliableOrdered,
            data,
        }
    }
}

/// The trait a game mode implements.
///
/// All hooks are associated functions taking the state explicitly: the
/// runtime owns the state and lends it for the duration of one call.
/// Hooks are never called concurrently for the same session.
pub trait SessionLogic: Send + Sync + 'static {
    /// Creation parameters, supplied by whoever spawns the session.
    type Params: Send + Clone + Default + 'static;

    /// The authoritative state of one session.
    type State: Send + 'static;

    /// Builds the initial state. Called once, before the first tick.
    fn init(params: &Self::Params) -> Initialized<Self::State>;

    /// Decides whether a player may join. Default: accept everyone.
    fn join_attempt(
        _state: &Self::State,
        _player: &PlayerId,
        _metadata: &HashMap<String, String>,
    ) -> JoinDecision {
        JoinDecision::accept()
    }

    /// Called after one or more join attempts were accepted.
    fn join(state: &mut Self::State, players: &[PlayerId]);

    /// Called when players leave or disconnect.
    fn leave(state: &mut Self::State, players: &[PlayerId]);

    /// Advances the state by one tick.
    ///
    /// `inputs` holds everything received since the previous tick, in
    /// arrival order. The returned broadcasts go to every current
    /// member.
    fn tick(state: &mut Self::State, tick: u64, inputs: Vec<ClientInput>) -> Vec<Broadcast>;

    /// Out-of-band request from the host. Default: empty reply.
    fn signal(_state: &mut Self::State, _data: &str) -> String {
        String::new()
    }

    /// Called once when the host shuts the session down.
    fn terminate(_state: &mut Self::State, _grace: Duration) {}
}
