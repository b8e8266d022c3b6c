//! Unified error type for the Terrabound server.

use terrabound_matchmaker::MatchmakerError;
use terrabound_protocol::ProtocolError;
use terrabound_session::SessionError;
use terrabound_transport::TransportError;

use crate::AuthError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum TerraboundError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Matchmaker(#[from] MatchmakerError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}
