//! Runtime configuration and lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use terrabound_tick::TickPolicy;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings shared by every runtime a [`SessionManager`] spawns.
///
/// The tick rate itself is chosen by the session logic's `init`; this
/// only controls how the actor around it behaves.
///
/// [`SessionManager`]: crate::SessionManager
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of each runtime's command channel. When it's full,
    /// senders wait.
    pub channel_size: usize,

    /// What the tick scheduler does after a late tick.
    pub tick_policy: TickPolicy,

    /// Upper bound (µs) of the random delay before a runtime's first
    /// tick. 0 disables it.
    pub initial_jitter_us: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            tick_policy: TickPolicy::Skip,
            initial_jitter_us: 2_000,
        }
    }
}

// ---------------------------------------------------------------------------
// RuntimeState
// ---------------------------------------------------------------------------

/// Lifecycle of a session runtime.
///
/// ```text
/// Created → Running → Terminated
/// ```
///
/// - **Created**: logic initialized, actor not yet polling.
/// - **Running**: handling joins, leaves, inputs and ticks.
/// - **Terminated**: terminate hook ran; the actor has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeState {
    Created,
    Running,
    Terminated,
}

impl RuntimeState {
    /// The only state that accepts joins and inputs.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Next state in the lifecycle, `None` once terminated.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Running),
            Self::Running => Some(Self::Terminated),
            Self::Terminated => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Running => write!(f, "Running"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}
