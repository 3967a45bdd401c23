//! Parsing of one input line into a [`Command`]

use crate::core::types::{Address, AddressRange, ChangePredicate, MemoryError, NumericType};
use crate::process::RegionKind;
use std::str::FromStr;

/// One operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Detach, keeping snapshots on disk
    Quit,
    /// Detach and delete all persisted snapshots
    QuitAndClean,
    ListTypes,
    Search {
        value: String,
        value_type: NumericType,
        refine: bool,
    },
    ScanUnknown {
        value_type: NumericType,
        predicate: Option<ChangePredicate>,
    },
    Read {
        address: Address,
        value_type: NumericType,
    },
    Write {
        address: Address,
        value: String,
        value_type: NumericType,
    },
    ShowRange,
    SetRange(AddressRange),
    SetRegion(RegionKind),
}

fn invalid(line: &str) -> MemoryError {
    MemoryError::InvalidCommand(format!("'{}', enter '?' to see available commands", line))
}

impl FromStr for Command {
    type Err = MemoryError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, rest)) = args.split_first() else {
            return Err(invalid(line));
        };

        let command = match (head, rest) {
            ("?", []) => Command::Help,
            ("q", []) => Command::Quit,
            ("qq", []) => Command::QuitAndClean,
            ("t?", []) => Command::ListTypes,
            ("s" | "sc", [value, value_type]) => Command::Search {
                value: value.to_string(),
                value_type: value_type.parse()?,
                refine: head == "sc",
            },
            ("r", [address, value_type]) => Command::Read {
                address: address.parse()?,
                value_type: value_type.parse()?,
            },
            ("w", [address, value, value_type]) => Command::Write {
                address: address.parse()?,
                value: value.to_string(),
                value_type: value_type.parse()?,
            },
            ("esr?", []) => Command::ShowRange,
            ("esr=", [region]) => Command::SetRegion(region.parse()?),
            ("esr=", [start, end]) => {
                Command::SetRange(AddressRange::new(start.parse()?, end.parse()?)?)
            }
            (head, [value_type]) if head.starts_with("su") => {
                let predicate = match &head[2..] {
                    "" => None,
                    symbol => Some(symbol.parse()?),
                };
                Command::ScanUnknown {
                    value_type: value_type.parse()?,
                    predicate,
                }
            }
            _ => return Err(invalid(line)),
        };

        Ok(command)
    }
}
