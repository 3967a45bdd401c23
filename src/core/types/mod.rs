//! Core type definitions for memscan
//!
//! Address wrappers, numeric types and values, snapshot samples and the
//! error type shared by every module.

mod address;
mod error;
mod sample;
mod value;

// Re-export all public types
pub use address::{Address, AddressRange};
pub use error::{MemoryError, MemoryResult};
pub use sample::{ChangePredicate, Sample};
pub use value::{NumericType, Value};
