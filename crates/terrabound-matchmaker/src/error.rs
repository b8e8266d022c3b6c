//! Error types for matchmaking and its backing stores.

use terrabound_protocol::{PlayerId, SessionId};

/// Failures of the session registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A conditional write carried a version that is no longer current.
    #[error("version conflict on registry key {key}")]
    VersionConflict { key: String },

    /// The backing store couldn't be reached.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// A stored record isn't a valid registry entry.
    #[error("registry record {key} is malformed: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode registry entry: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Failures of the account store.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account {0} not found")]
    NotFound(PlayerId),

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// The session runtime couldn't be created.
#[derive(Debug, thiserror::Error)]
#[error("failed to spawn session: {0}")]
pub struct SpawnError(pub String);

/// Errors returned by [`Allocator::request_session`].
///
/// [`Allocator::request_session`]: crate::Allocator::request_session
#[derive(Debug, thiserror::Error)]
pub enum MatchmakerError {
    /// No caller identity, or an empty one.
    #[error("missing user session")]
    Unauthenticated,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("session create failed: {0}")]
    SessionCreate(String),

    /// Every claim on the chosen session lost a version race.
    #[error("session {session_id} still contended after {attempts} attempts")]
    Contention { session_id: SessionId, attempts: u32 },
}

impl MatchmakerError {
    /// HTTP-style status reported to the client.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Registry(RegistryError::VersionConflict { .. }) => 409,
            Self::Registry(_) => 502,
            Self::SessionCreate(_) => 503,
            Self::Contention { .. } => 409,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MatchmakerError::Unauthenticated.status_code(), 401);
        assert_eq!(
            MatchmakerError::Registry(RegistryError::Unavailable("down".into())).status_code(),
            502
        );
        assert_eq!(
            MatchmakerError::Registry(RegistryError::VersionConflict { key: "k".into() })
                .status_code(),
            409
        );
        assert_eq!(MatchmakerError::SessionCreate("x".into()).status_code(), 503);
        assert_eq!(
            MatchmakerError::Contention {
                session_id: SessionId::from("s"),
                attempts: 4
            }
            .status_code(),
            409
        );
    }

    #[test]
    fn test_registry_error_is_transparent() {
        let err: MatchmakerError = RegistryError::Unavailable("down".into()).into();
        assert_eq!(err.to_string(), "registry unavailable: down");
    }
}
