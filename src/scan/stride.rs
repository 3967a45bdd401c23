//! Chunk-boundary-safe stride decoding

use crate::codec;
use crate::core::types::{Address, AddressRange, MemoryError, MemoryResult, NumericType, Sample};

/// Decodes a byte stream covering one address range into samples, one per
/// `width` bytes, however the stream happens to be chunked.
///
/// Bytes of a word split across chunks are carried over to the next
/// [`feed`](Self::feed). Words are little-endian in the stream.
#[derive(Debug)]
pub struct StrideDecoder {
    value_type: NumericType,
    next_address: Address,
    end: Address,
    carry: Vec<u8>,
}

impl StrideDecoder {
    /// Rejects ranges whose length is not a whole number of words
    pub fn new(range: AddressRange, value_type: NumericType) -> MemoryResult<Self> {
        let width = value_type.width() as u64;
        if range.len() % width != 0 {
            return Err(MemoryError::InvalidRange(format!(
                "{} is {} bytes long, not a multiple of the {}-byte {} width",
                range,
                range.len(),
                width,
                value_type
            )));
        }

        Ok(StrideDecoder {
            value_type,
            next_address: range.start,
            end: range.end,
            carry: Vec::with_capacity(value_type.width()),
        })
    }

    /// Address the next completed word will be reported at
    pub fn next_address(&self) -> Address {
        self.next_address
    }

    /// Decodes every word completed by `chunk` into `out`.
    ///
    /// Bytes past the end of the range are ignored.
    pub fn feed(&mut self, chunk: &[u8], out: &mut Vec<Sample>) -> MemoryResult<()> {
        let width = self.value_type.width();
        let remaining = (self.end.0 - self.next_address.0) as usize - self.carry.len();
        let mut chunk = &chunk[..chunk.len().min(remaining)];

        if !self.carry.is_empty() {
            let needed = width - self.carry.len();
            let take = needed.min(chunk.len());
            self.carry.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            if self.carry.len() < width {
                return Ok(());
            }
            let word = std::mem::take(&mut self.carry);
            self.push_word(&word, out)?;
            self.carry = word;
            self.carry.clear();
        }

        let mut words = chunk.chunks_exact(width);
        for word in words.by_ref() {
            self.push_word(word, out)?;
        }
        self.carry.extend_from_slice(words.remainder());
        Ok(())
    }

    /// Confirms the stream covered the whole range
    pub fn finish(self) -> MemoryResult<()> {
        if self.next_address != self.end {
            let reached = self.next_address.0 + self.carry.len() as u64;
            return Err(MemoryError::short_read(self.end, Address::new(reached)));
        }
        Ok(())
    }

    fn push_word(&mut self, word: &[u8], out: &mut Vec<Sample>) -> MemoryResult<()> {
        let mut buf = [0u8; NumericType::MAX_WIDTH];
        let canonical = buf
            .get_mut(..word.len())
            .ok_or_else(|| MemoryError::malformed_input(self.value_type.width(), word.len()))?;
        canonical.copy_from_slice(word);
        // Endianness fix-up: memory order to canonical order
        canonical.reverse();

        let value = codec::decode(canonical, self.value_type)?;
        out.push(Sample::new(self.next_address, value));
        self.next_address = self.next_address.checked_add(word.len() as u64)?;
        Ok(())
    }
}
