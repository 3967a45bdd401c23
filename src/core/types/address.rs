//! Memory address wrapper type with hex parsing, plus half-open address ranges

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents an address in the observed process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Address(pub u64);

impl Address {
    /// Creates a new address from a u64 value
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Returns the raw u64 value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Adds a byte offset, failing on overflow
    pub fn checked_add(&self, offset: u64) -> MemoryResult<Self> {
        self.0
            .checked_add(offset)
            .map(Address)
            .ok_or_else(|| MemoryError::InvalidAddress(format!("{} + {:#x} overflows", self, offset)))
    }

    /// Checks if the address is aligned to the specified boundary
    pub const fn is_aligned(&self, alignment: u64) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
        } else if let Some(hex) = s.strip_prefix('$') {
            u64::from_str_radix(hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            // Assume hex if contains letters
            u64::from_str_radix(s, 16)
        } else {
            s.parse::<u64>()
        };

        value
            .map(Address::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

/// Formats as `0x` followed by minimal lowercase hex, the persisted form
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = MemoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::new(value)
    }
}

/// Half-open address range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct AddressRange {
    pub start: Address,
    pub end: Address,
}

/// Unchecked bounds as read from disk
#[derive(Deserialize)]
struct RangeBounds {
    start: Address,
    end: Address,
}

impl TryFrom<RangeBounds> for AddressRange {
    type Error = MemoryError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        AddressRange::new(bounds.start, bounds.end)
    }
}

impl AddressRange {
    /// Creates a range, rejecting `end < start`
    pub fn new(start: Address, end: Address) -> MemoryResult<Self> {
        if end < start {
            return Err(MemoryError::InvalidRange(format!(
                "end {} is below start {}",
                end, start
            )));
        }
        Ok(AddressRange { start, end })
    }

    /// Number of bytes covered by the range
    pub fn len(&self) -> u64 {
        self.end.0 - self.start.0
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, address: Address) -> bool {
        address >= self.start && address < self.end
    }

    /// Whether `other` lies entirely within this range
    pub fn covers(&self, other: &AddressRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
