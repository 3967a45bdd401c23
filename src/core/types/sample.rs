//! Snapshot samples and the predicates used to compare them

use super::{Address, MemoryError, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One decoded value at one address, the unit of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub address: Address,
    pub value: Value,
}

impl Sample {
    pub fn new(address: Address, value: Value) -> Self {
        Sample { address, value }
    }
}

/// Formats as one persisted snapshot line, without the trailing newline
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.value)
    }
}

/// Comparison between a sample's current value and its value in a prior snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePredicate {
    GreaterThan,
    LessThan,
    Equal,
    NotEqual,
}

impl ChangePredicate {
    /// Whether `current` relates to `previous` as this predicate requires.
    ///
    /// Follows the value's own comparison, so for floats NaN is never
    /// greater, less or equal, and always not-equal.
    pub fn holds(&self, current: &Value, previous: &Value) -> bool {
        match self {
            ChangePredicate::GreaterThan => current > previous,
            ChangePredicate::LessThan => current < previous,
            ChangePredicate::Equal => current == previous,
            ChangePredicate::NotEqual => current != previous,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            ChangePredicate::GreaterThan => ">",
            ChangePredicate::LessThan => "<",
            ChangePredicate::Equal => "=",
            ChangePredicate::NotEqual => "!=",
        }
    }
}

impl fmt::Display for ChangePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ChangePredicate {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(ChangePredicate::GreaterThan),
            "<" => Ok(ChangePredicate::LessThan),
            "=" => Ok(ChangePredicate::Equal),
            "!=" => Ok(ChangePredicate::NotEqual),
            other => Err(MemoryError::InvalidCommand(format!(
                "unknown change predicate '{}'",
                other
            ))),
        }
    }
}
