use std::time::Duration;

use terrabound_matchmaker::AllocatorConfig;
use terrabound_session::SessionConfig;

/// Everything the server needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// How long a new connection may take to send its handshake.
    pub handshake_timeout: Duration,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
    pub session: SessionConfig,
    pub allocator: AllocatorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7350".to_owned(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(15),
            session: SessionConfig::default(),
            allocator: AllocatorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = ServerConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(15));
        assert_eq!(config.allocator.max_players, 8);
    }
}
