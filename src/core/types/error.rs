//! Custom error types for memscan

use std::fmt;
use thiserror::Error;

/// Main error type for scan, snapshot and search operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Not a number: {0}")]
    NotANumber(String),

    #[error("Value {value} is out of range for {value_type}")]
    OutOfRange { value: String, value_type: String },

    #[error("Malformed input: expected {expected} bytes, got {actual}")]
    MalformedInput { expected: usize, actual: usize },

    #[error("Value type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Snapshot is incomplete: {0}")]
    Incomplete(String),

    #[error("Corrupt snapshot {label} at line {line}: {reason}")]
    CorruptSnapshot {
        label: String,
        line: u64,
        reason: String,
    },

    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    #[error("No previous found values to filter")]
    NoBaseline,

    #[error("Current snapshot has no sample for {address} ({emitted} matches emitted before abort)")]
    MergeExhausted { address: String, emitted: u64 },

    #[error("Byte source ended early: range ends at {expected}, stream ended at {actual}")]
    ShortRead { expected: String, actual: String },

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid pattern format: {0}")]
    InvalidPattern(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Invalid address range: {0}")]
    InvalidRange(String),

    #[error("Memory region not found: {0}")]
    RegionNotFound(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates an out of range error
    pub fn out_of_range(value: impl fmt::Display, value_type: impl fmt::Display) -> Self {
        MemoryError::OutOfRange {
            value: value.to_string(),
            value_type: value_type.to_string(),
        }
    }

    /// Creates a malformed input error for a byte length mismatch
    pub fn malformed_input(expected: usize, actual: usize) -> Self {
        MemoryError::MalformedInput { expected, actual }
    }

    /// Creates a type mismatch error
    pub fn type_mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        MemoryError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a corrupt snapshot error
    pub fn corrupt_snapshot(label: impl fmt::Display, line: u64, reason: impl Into<String>) -> Self {
        MemoryError::CorruptSnapshot {
            label: label.to_string(),
            line,
            reason: reason.into(),
        }
    }

    /// Creates a merge exhaustion error
    pub fn merge_exhausted(address: impl fmt::Display, emitted: u64) -> Self {
        MemoryError::MergeExhausted {
            address: address.to_string(),
            emitted,
        }
    }

    /// Creates a short read error
    pub fn short_read(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        MemoryError::ShortRead {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether the error is a reportable "nothing to work with" condition
    /// rather than a failure of the operation itself.
    pub fn is_missing_baseline(&self) -> bool {
        matches!(self, MemoryError::NotFound(_) | MemoryError::NoBaseline)
    }
}
