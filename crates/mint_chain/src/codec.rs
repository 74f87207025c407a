//! Canonical binary encoding
//!
//! Everything that needs canonical bytes (hashing, disk snapshots, size
//! accounting) goes through bincode 2 with the `standard()` configuration.
//! Integers are varint encoded, which is why body framing size depends on
//! the magnitude of the subsidy field.

use crate::error::ChainError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, ChainError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| ChainError::Encode(e.to_string()))
}

pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ChainError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| ChainError::Decode(e.to_string()))
}

pub fn encoded_size<T: Serialize>(value: &T) -> Result<usize, ChainError> {
    to_vec(value).map(|bytes| bytes.len())
}

/// Encoded width of a varint length or integer under the standard config
pub fn varint_len(n: u64) -> usize {
    match n {
        0..=250 => 1,
        251..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}
