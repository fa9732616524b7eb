// Codec - Canonical wire encoding
//
// Every signed or persisted structure goes through these two functions so
// that all nodes agree on the byte representation: bincode with varint
// integers, little-endian, a hard size limit and trailing bytes rejected.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound for any single encoded object (transaction + payload)
pub const MAX_ENCODED_LEN: u64 = 6144 + 10_000;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
        .with_limit(MAX_ENCODED_LEN)
}

/// Encode a value canonically
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    options()
        .serialize(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a value, rejecting trailing bytes and oversized input
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    options()
        .deserialize(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}
