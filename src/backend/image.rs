//! In-memory address space

use super::{ByteSource, SearchBackend, WriteBackend};
use crate::core::types::{Address, AddressRange, MemoryError, MemoryResult};
use crate::search::find_aligned;
use std::io::Cursor;

/// A contiguous block of bytes mapped at `base`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    base: Address,
    bytes: Vec<u8>,
}

impl MemoryImage {
    pub fn new(base: Address, bytes: Vec<u8>) -> Self {
        MemoryImage { base, bytes }
    }

    /// Builds an image of consecutive little-endian `u32` words
    pub fn from_words(base: Address, words: &[u32]) -> Self {
        let bytes = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        MemoryImage::new(base, bytes)
    }

    pub fn base(&self) -> Address {
        self.base
    }

    /// The whole mapped range
    pub fn range(&self) -> AddressRange {
        AddressRange {
            start: self.base,
            end: Address::new(self.base.0 + self.bytes.len() as u64),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrites one little-endian `u32` word
    pub fn set_word(&mut self, address: Address, word: u32) -> MemoryResult<()> {
        let offset = self.offset_of(address, 4)?;
        self.bytes[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        Ok(())
    }

    fn offset_of(&self, address: Address, len: usize) -> MemoryResult<usize> {
        let mapped = self.range();
        let end = address.checked_add(len as u64)?;
        if address < mapped.start || end > mapped.end {
            return Err(MemoryError::InvalidAddress(format!(
                "{}+{} is outside {}",
                address, len, mapped
            )));
        }
        Ok((address.0 - self.base.0) as usize)
    }

    fn slice(&self, range: AddressRange) -> MemoryResult<&[u8]> {
        let offset = self.offset_of(range.start, range.len() as usize)?;
        Ok(&self.bytes[offset..offset + range.len() as usize])
    }
}

impl ByteSource for MemoryImage {
    type Reader = Cursor<Vec<u8>>;

    async fn open_range(&self, range: AddressRange) -> MemoryResult<Self::Reader> {
        Ok(Cursor::new(self.slice(range)?.to_vec()))
    }

    async fn read_at(&self, address: Address, len: usize) -> MemoryResult<Vec<u8>> {
        let offset = self.offset_of(address, len)?;
        Ok(self.bytes[offset..offset + len].to_vec())
    }
}

impl SearchBackend for MemoryImage {
    async fn search(&self, range: AddressRange, pattern: &[u8]) -> MemoryResult<Vec<Address>> {
        find_aligned(self.slice(range)?, range.start, pattern)
    }
}

impl WriteBackend for MemoryImage {
    async fn write_at(&mut self, address: Address, bytes: &[u8]) -> MemoryResult<()> {
        let offset = self.offset_of(address, bytes.len())?;
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
