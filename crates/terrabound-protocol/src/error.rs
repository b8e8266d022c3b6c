//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// Each Terrabound crate owns its own error enum, so a `ProtocolError`
/// always means the problem is in (de)serialization rather than in the
/// network or in a session.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Turning a value into bytes failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Turning bytes into a value failed: malformed JSON, missing
    /// fields, wrong types, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// handshake that isn't the first message on a connection.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
