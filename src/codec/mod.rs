//! Fixed-width numeric codec
//!
//! Converts between typed [`Value`]s and their exact byte patterns. The
//! codec's canonical byte order is big-endian (most significant byte first,
//! the order a value is written as hex). Memory of the observed process is
//! little-endian, so callers go through [`reverse_byte_order`] when moving
//! between the two.

mod validator;

pub use validator::{validate, validate_value};

use crate::core::types::{MemoryError, MemoryResult, NumericType, Value};

/// Decodes a canonical (big-endian) byte pattern as `value_type`
pub fn decode(bytes: &[u8], value_type: NumericType) -> MemoryResult<Value> {
    let word: [u8; 4] = bytes
        .try_into()
        .map_err(|_| MemoryError::malformed_input(value_type.width(), bytes.len()))?;

    let value = match value_type {
        NumericType::Unsigned32 => Value::U32(u32::from_be_bytes(word)),
        // Two's complement: unsigned readings above i32::MAX wrap by 2^32
        NumericType::Signed32 => Value::I32(i32::from_be_bytes(word)),
        NumericType::Float32 => Value::F32(f32::from_bits(u32::from_be_bytes(word))),
    };
    Ok(value)
}

/// Encodes a value as `value_type` in canonical (big-endian) byte order
pub fn encode(value: Value, value_type: NumericType) -> MemoryResult<Vec<u8>> {
    let bytes = match validate_value(value, value_type)? {
        Value::U32(v) => v.to_be_bytes(),
        Value::I32(v) => v.to_be_bytes(),
        Value::F32(v) => v.to_bits().to_be_bytes(),
    };
    Ok(bytes.to_vec())
}

/// Reverses byte order; converts between in-memory little-endian patterns
/// and the canonical form. Its own inverse.
pub fn reverse_byte_order(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Decodes a word exactly as it sits in (little-endian) memory
pub fn decode_le(bytes: &[u8], value_type: NumericType) -> MemoryResult<Value> {
    decode(&reverse_byte_order(bytes), value_type)
}
