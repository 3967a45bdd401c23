//! Aligned byte-pattern matching
//!
//! Matches only count at offsets that are a whole number of pattern widths
//! from the start of the searched range, the same alignment scans use.

use crate::core::types::{Address, MemoryError, MemoryResult};
use rayon::prelude::*;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Finds `pattern` at aligned offsets of `haystack`, which starts at `base`.
///
/// Words are compared on the rayon pool; results stay in address order.
pub fn find_aligned(haystack: &[u8], base: Address, pattern: &[u8]) -> MemoryResult<Vec<Address>> {
    check_pattern(pattern)?;
    let width = pattern.len();
    Ok(haystack
        .par_chunks_exact(width)
        .enumerate()
        .filter(|(_, word)| *word == pattern)
        .map(|(i, _)| Address::new(base.0 + (i * width) as u64))
        .collect())
}

/// Streams `reader` (the bytes starting at `start`) in `chunk_size` reads,
/// collecting aligned matches in ascending order
pub async fn search_stream<R>(
    reader: &mut R,
    start: Address,
    pattern: &[u8],
    chunk_size: usize,
) -> MemoryResult<Vec<Address>>
where
    R: AsyncRead + Unpin,
{
    check_pattern(pattern)?;
    let width = pattern.len();
    let mut chunk = vec![0u8; chunk_size.max(width)];
    let mut pending: Vec<u8> = Vec::with_capacity(chunk.len() + width);
    let mut base = start.0;
    let mut matches = Vec::new();

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        pending.extend_from_slice(&chunk[..read]);

        let whole = pending.len() - pending.len() % width;
        matches.extend(find_aligned(&pending[..whole], Address::new(base), pattern)?);
        pending.drain(..whole);
        base += whole as u64;
    }

    Ok(matches)
}

fn check_pattern(pattern: &[u8]) -> MemoryResult<()> {
    if pattern.is_empty() {
        return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
    }
    Ok(())
}
