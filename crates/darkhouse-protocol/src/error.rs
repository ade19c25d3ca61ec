//! Error types for the protocol layer.

/// Errors raised while turning messages into bytes or back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed input: bad JSON, an unknown `type` tag, a missing field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
