//! memscan library for finding and tracking values in live process memory

pub mod backend;
pub mod codec;
pub mod config;
pub mod core;
pub mod diff;
pub mod process;
pub mod repl;
pub mod scan;
pub mod search;
pub mod session;
pub mod snapshot;

// Re-export main types from core module
pub use core::types::{
    Address, AddressRange, ChangePredicate, MemoryError, MemoryResult, NumericType, Sample, Value,
};

pub use backend::{ByteSource, MemoryBackend, MemoryImage, ProcMemory, SearchBackend, WriteBackend};
pub use diff::DiffEngine;
pub use scan::ScanEngine;
pub use search::{CandidateFilter, CandidateSet};
pub use session::{ScanOptions, ScanReport, ScanSession};
pub use snapshot::{SnapshotSlot, SnapshotStore};
