//! Byte encoding for wire messages.
//!
//! The server only depends on the [`Codec`] trait, so the JSON encoding
//! used by browser clients can be swapped for a binary one without touching
//! the session layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts messages to and from bytes.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON over `serde_json`. Readable in browser dev tools.
///
/// ```rust
/// use darkhouse_protocol::{ClientIntent, Codec, JsonCodec};
///
/// let intent: ClientIntent = JsonCodec.decode(br#"{"type":"create"}"#).unwrap();
/// assert_eq!(intent, ClientIntent::Create);
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
