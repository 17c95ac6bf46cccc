//! Codec trait and implementations for serializing events to bytes.
//!
//! The framing and handshake of the underlying socket belong to the
//! transport layer; the codec only decides how an envelope becomes bytes.
//! Keeping it behind a trait means a binary codec can replace JSON later
//! without touching the gateway or the room layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between Rust values and wire bytes.
///
/// `Send + Sync + 'static` because the codec is shared across connection
/// handler tasks for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON codec via `serde_json`.
///
/// Human-readable, inspectable in browser dev tools, and what the client
/// SDK speaks. Behind the `json` feature flag (enabled by default).
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
