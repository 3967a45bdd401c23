//! Stride scanning of a byte stream into a snapshot
//!
//! [`ScanEngine`] pulls chunks from any [`AsyncRead`] covering an address
//! range and streams the decoded samples into a sink, so arbitrarily large
//! ranges never sit in memory at once.

mod stride;

pub use stride::StrideDecoder;

use crate::core::types::{AddressRange, MemoryResult, NumericType, Sample};
use crate::snapshot::{SampleSink, SnapshotMeta, SnapshotSlot, SnapshotStore};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument, warn};

/// Default number of bytes requested from the byte source per read
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Drives a [`StrideDecoder`] over an async byte source
#[derive(Debug, Clone)]
pub struct ScanEngine {
    chunk_size: usize,
}

impl Default for ScanEngine {
    fn default() -> Self {
        ScanEngine::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ScanEngine {
    /// Creates an engine reading at most `chunk_size` bytes at a time
    pub fn new(chunk_size: usize) -> Self {
        ScanEngine {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Decodes `source` (the raw bytes of `range`) into `sink`, returning the
    /// number of samples produced
    #[instrument(skip_all, fields(%range, %value_type))]
    pub async fn scan<R, S>(
        &self,
        source: &mut R,
        range: AddressRange,
        value_type: NumericType,
        sink: &mut S,
    ) -> MemoryResult<u64>
    where
        R: AsyncRead + Unpin,
        S: SampleSink,
    {
        let mut decoder = StrideDecoder::new(range, value_type)?;
        let mut chunk = vec![0u8; self.chunk_size];
        let mut batch: Vec<Sample> = Vec::with_capacity(self.chunk_size / value_type.width() + 1);
        let mut produced = 0u64;

        loop {
            let read = source.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            decoder.feed(&chunk[..read], &mut batch)?;
            if !batch.is_empty() {
                sink.append(&batch).await?;
                produced += batch.len() as u64;
                batch.clear();
            }
        }

        decoder.finish()?;
        debug!(samples = produced, "Stride scan finished");
        Ok(produced)
    }

    /// Scans into a fresh snapshot in `slot`.
    ///
    /// On failure the partial snapshot is discarded, so the slot is left
    /// empty rather than holding truncated data.
    pub async fn scan_into<R>(
        &self,
        store: &SnapshotStore,
        slot: SnapshotSlot,
        source: &mut R,
        range: AddressRange,
        value_type: NumericType,
    ) -> MemoryResult<SnapshotMeta>
    where
        R: AsyncRead + Unpin,
    {
        let mut writer = store.begin_write(slot, value_type, range).await?;

        let outcome = match self.scan(source, range, value_type, &mut writer).await {
            Ok(_) => writer.finish().await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(meta) => {
                info!("Saved {} {} values to {} snapshot", meta.samples, value_type, slot);
                Ok(meta)
            }
            Err(e) => {
                warn!("Scan of {} aborted: {}", range, e);
                store.discard(slot).await?;
                Err(e)
            }
        }
    }
}
