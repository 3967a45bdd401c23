//! Numeric types understood by the scanner and their decoded values

use super::error::MemoryError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The closed set of fixed-width numeric types the scanner can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericType {
    #[serde(rename = "uint32")]
    Unsigned32,
    #[serde(rename = "int32")]
    Signed32,
    #[serde(rename = "float32")]
    Float32,
}

impl NumericType {
    /// Every supported type, in the order shown to the user
    pub const ALL: [NumericType; 3] = [
        NumericType::Unsigned32,
        NumericType::Signed32,
        NumericType::Float32,
    ];

    /// Width of the widest supported type
    pub const MAX_WIDTH: usize = 4;

    /// Size in bytes of one encoded value
    pub const fn width(&self) -> usize {
        match self {
            NumericType::Unsigned32 | NumericType::Signed32 | NumericType::Float32 => 4,
        }
    }

    /// Inclusive valid range for integer types; `None` for floats, which
    /// accept any bit pattern
    pub const fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            NumericType::Unsigned32 => Some((0, u32::MAX as i64)),
            NumericType::Signed32 => Some((i32::MIN as i64, i32::MAX as i64)),
            NumericType::Float32 => None,
        }
    }

    /// Number of distinct values of an integer type (`max - min + 1`)
    pub const fn range_size(&self) -> Option<i64> {
        match self.bounds() {
            Some((min, max)) => Some(max - min + 1),
            None => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            NumericType::Unsigned32 => "uint32",
            NumericType::Signed32 => "int32",
            NumericType::Float32 => "float32",
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumericType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                MemoryError::InvalidCommand(format!(
                    "unknown value type '{}', expected one of uint32, int32, float32",
                    s
                ))
            })
    }
}

/// A decoded value; the active arm always matches the type it was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    U32(u32),
    I32(i32),
    F32(f32),
}

impl Value {
    /// Gets the numeric type for this value
    pub fn numeric_type(&self) -> NumericType {
        match self {
            Value::U32(_) => NumericType::Unsigned32,
            Value::I32(_) => NumericType::Signed32,
            Value::F32(_) => NumericType::Float32,
        }
    }
}

/// Values only order against values of the same type. Floats follow IEEE-754,
/// so any comparison involving NaN is unordered.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::U32(a), Value::U32(b)) => a.partial_cmp(b),
            (Value::I32(a), Value::I32(b)) => a.partial_cmp(b),
            (Value::F32(a), Value::F32(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U32(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
        }
    }
}
