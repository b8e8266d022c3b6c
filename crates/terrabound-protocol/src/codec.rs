//! Codec trait and the JSON implementation.
//!
//! Everything above the transport speaks in typed values; everything
//! below it speaks in bytes. A [`Codec`] is the seam between the two.
//! Session runtimes use it to encode their per-tick broadcast, and the
//! connection handler uses it for envelopes.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` so a single codec can be shared by every
/// connection task and every session actor.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// The broadcast snapshot, the position input and the registry record
/// are all JSON, so this is the only codec the server ships with.
///
/// ```rust
/// use terrabound_protocol::{Codec, JsonCodec, MatchData, OpCode};
///
/// let codec = JsonCodec;
/// let frame = MatchData { op_code: OpCode::STATE_SNAPSHOT, data: b"{}".to_vec() };
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: MatchData = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::PlayerId;

    #[test]
    fn test_json_codec_decode_malformed_returns_decode_error() {
        let result: Result<PlayerId, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encode_produces_plain_json() {
        let bytes = JsonCodec.encode(&PlayerId::from("alice")).unwrap();
        assert_eq!(bytes, b"\"alice\"");
    }
}
