//! Core module containing fundamental types for memscan
//!
//! This module provides the foundational building blocks used throughout
//! the scanner: addresses and ranges, numeric types and values, snapshot
//! samples, change predicates and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, AddressRange, ChangePredicate, MemoryError, MemoryResult, NumericType, Sample, Value,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
