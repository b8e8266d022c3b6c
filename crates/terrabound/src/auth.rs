//! Player authentication during the handshake.

use std::future::Future;

use terrabound_protocol::PlayerId;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The handshake carried no token, or an empty one.
    #[error("missing token")]
    MissingToken,

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Turns a handshake token into a player identity.
///
/// Implement this against your account service. The server calls it
/// once per connection, before anything else is accepted.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, token: &str) -> impl Future<Output = Result<PlayerId, AuthError>> + Send;
}

/// Trusts the token as the player id. For local development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<PlayerId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(PlayerId::from(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_authenticator_uses_token_as_id() {
        let id = DevAuthenticator.authenticate("alice").await.unwrap();
        assert_eq!(id, PlayerId::from("alice"));
    }

    #[tokio::test]
    async fn test_dev_authenticator_rejects_blank_token() {
        assert!(matches!(
            DevAuthenticator.authenticate("  ").await,
            Err(AuthError::MissingToken)
        ));
    }
}
