//! Memory backends the scanner reads, searches and writes through
//!
//! A backend exposes a target address space. [`MemoryImage`] holds one in
//! memory; [`ProcMemory`] reaches a live Linux process via `/proc/<pid>/mem`.
//! Bytes are always in the target's little-endian order.

mod image;
mod proc_mem;

pub use image::MemoryImage;
pub use proc_mem::ProcMemory;

use crate::core::types::{Address, AddressRange, MemoryResult};
use tokio::io::AsyncRead;

/// Raw byte access to an address space
#[allow(async_fn_in_trait)]
pub trait ByteSource {
    type Reader: AsyncRead + Unpin;

    /// A stream of exactly the bytes of `range`, in address order
    async fn open_range(&self, range: AddressRange) -> MemoryResult<Self::Reader>;

    /// Reads `len` bytes starting at `address`
    async fn read_at(&self, address: Address, len: usize) -> MemoryResult<Vec<u8>>;
}

/// Exact byte-pattern search
#[allow(async_fn_in_trait)]
pub trait SearchBackend {
    /// Ascending addresses in `range` holding `pattern`, counting only
    /// offsets from `range.start` that are multiples of the pattern length
    async fn search(&self, range: AddressRange, pattern: &[u8]) -> MemoryResult<Vec<Address>>;
}

/// Raw byte writes into an address space
#[allow(async_fn_in_trait)]
pub trait WriteBackend {
    async fn write_at(&mut self, address: Address, bytes: &[u8]) -> MemoryResult<()>;
}

/// Everything a scan session needs from its target
pub trait MemoryBackend: ByteSource + SearchBackend + WriteBackend {}

impl<T: ByteSource + SearchBackend + WriteBackend> MemoryBackend for T {}
