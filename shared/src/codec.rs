//! Datagram encoding.
//!
//! Browser relays speak JSON, native clients speak bincode. The server picks
//! the format from the first byte of each datagram and answers every client
//! in the format it connected with.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    Json,
    #[default]
    Bincode,
}

impl WireFormat {
    /// JSON events are objects or bare strings. Bincode events start with a
    /// little-endian variant index, which never collides with `{` or `"`.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') | Some(b'"') => WireFormat::Json,
            _ => WireFormat::Bincode,
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            WireFormat::Json => Ok(serde_json::to_vec(value)?),
            WireFormat::Bincode => Ok(bincode::serialize(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
            WireFormat::Bincode => Ok(bincode::deserialize(bytes)?),
        }
    }
}
