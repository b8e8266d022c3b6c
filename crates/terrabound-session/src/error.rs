//! Error types for the session layer.

use terrabound_protocol::{PlayerId, SessionId};

/// Errors that can occur while talking to session runtimes.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No runtime with this id is known to the manager.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The runtime's command channel is closed: it has terminated.
    #[error("session {0} is unavailable")]
    Unavailable(SessionId),

    /// The session logic refused the join attempt.
    #[error("join to session {session_id} rejected: {reason}")]
    JoinRejected { session_id: SessionId, reason: String },

    /// The player is already a member of a session.
    #[error("player {0} already in session {1}")]
    AlreadyInSession(PlayerId, SessionId),

    /// The player isn't in any session.
    #[error("player {0} is not in any session")]
    NotInSession(PlayerId),
}
