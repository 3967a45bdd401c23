//! Input validation for search and write values
//!
//! Integer input goes through a 64-bit integer parse so values near 2^32
//! never pass through floating point.

use crate::core::types::{MemoryError, MemoryResult, NumericType, Value};
use std::num::IntErrorKind;

/// Parses `text` as a value of `value_type`.
///
/// Integers accept an optional sign and either decimal digits or a `0x`
/// prefixed hex literal. Floats accept anything `f32` parsing accepts,
/// including `nan` and `inf`, and are never range checked.
pub fn validate(text: &str, value_type: NumericType) -> MemoryResult<Value> {
    let text = text.trim();

    match value_type.bounds() {
        Some((min, max)) => {
            let parsed = parse_integer(text)?;
            if parsed < min || parsed > max {
                return Err(MemoryError::out_of_range(text, value_type));
            }
            Ok(match value_type {
                NumericType::Signed32 => Value::I32(parsed as i32),
                _ => Value::U32(parsed as u32),
            })
        }
        None => text
            .parse::<f32>()
            .map(Value::F32)
            .map_err(|_| MemoryError::NotANumber(text.to_string())),
    }
}

/// Checks an already-typed value against `value_type`, converting between
/// the integer arms when the value is representable in the target type
pub fn validate_value(value: Value, value_type: NumericType) -> MemoryResult<Value> {
    let integer = match value {
        Value::U32(v) => i64::from(v),
        Value::I32(v) => i64::from(v),
        Value::F32(_) if value_type == NumericType::Float32 => return Ok(value),
        Value::F32(_) => return Err(MemoryError::type_mismatch(value_type, value.numeric_type())),
    };

    let Some((min, max)) = value_type.bounds() else {
        return Err(MemoryError::type_mismatch(value_type, value.numeric_type()));
    };
    if integer < min || integer > max {
        return Err(MemoryError::out_of_range(value, value_type));
    }

    Ok(match value_type {
        NumericType::Signed32 => Value::I32(integer as i32),
        _ => Value::U32(integer as u32),
    })
}

fn parse_integer(text: &str) -> MemoryResult<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, digits),
    };

    // Only one sign, and only before the prefix
    if digits.starts_with(['+', '-']) {
        return Err(MemoryError::NotANumber(text.to_string()));
    }

    let magnitude = i64::from_str_radix(digits, radix);

    match magnitude {
        Ok(m) => Ok(if negative { -m } else { m }),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                Err(MemoryError::OutOfRange {
                    value: text.to_string(),
                    value_type: "64-bit integer".to_string(),
                })
            }
            _ => Err(MemoryError::NotANumber(text.to_string())),
        },
    }
}
