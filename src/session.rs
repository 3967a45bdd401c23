//! Scan session
//!
//! A [`ScanSession`] owns everything one operator works with: the target
//! backend, the snapshot slots on disk, the configured search range and the
//! candidate set. Operations take `&mut self`, so at most one scan, diff or
//! search runs against the slots at a time.

use crate::backend::MemoryBackend;
use crate::codec;
use crate::config::ScannerConfig;
use crate::core::types::{
    Address, AddressRange, ChangePredicate, MemoryError, MemoryResult, NumericType, Value,
};
use crate::diff::{DiffEngine, DEFAULT_FLUSH_THRESHOLD};
use crate::process::{ProcessRegions, RegionKind};
use crate::scan::{ScanEngine, DEFAULT_CHUNK_SIZE};
use crate::search::{format_search_pattern, CandidateFilter, CandidateSet};
use crate::snapshot::{SnapshotMeta, SnapshotSlot, SnapshotStore};
use std::fmt;
use tracing::{info, instrument, warn};

/// Tuning knobs for scans and diffs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub chunk_size: usize,
    pub flush_threshold: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl From<&ScannerConfig> for ScanOptions {
    fn from(config: &ScannerConfig) -> Self {
        ScanOptions {
            chunk_size: config.chunk_size,
            flush_threshold: config.flush_threshold,
        }
    }
}

/// Outcome of an unknown-value scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub value_type: NumericType,
    pub range: AddressRange,
    /// Samples captured by the fresh scan
    pub scanned: u64,
    /// Samples now held in `current`
    pub kept: u64,
    pub predicate: Option<ChangePredicate>,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.predicate {
            None => write!(f, "Saved {} {} values", self.kept, self.value_type),
            Some(predicate) => write!(
                f,
                "Kept {} of {} {} values changed '{}'",
                self.kept, self.scanned, self.value_type, predicate
            ),
        }
    }
}

/// Scanner state for one target
pub struct ScanSession<B> {
    backend: B,
    store: SnapshotStore,
    range: AddressRange,
    regions: ProcessRegions,
    filter: CandidateFilter,
    scanner: ScanEngine,
    differ: DiffEngine,
}

impl<B: MemoryBackend> ScanSession<B> {
    /// Creates a session searching `range` of `backend`
    pub fn new(backend: B, store: SnapshotStore, range: AddressRange) -> Self {
        ScanSession {
            backend,
            store,
            range,
            regions: ProcessRegions::default(),
            filter: CandidateFilter::new(),
            scanner: ScanEngine::default(),
            differ: DiffEngine::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.scanner = ScanEngine::new(options.chunk_size);
        self.differ = DiffEngine::new(options.flush_threshold);
        self
    }

    /// Remembers discovered regions for [`set_region`](Self::set_region)
    pub fn with_regions(mut self, regions: ProcessRegions) -> Self {
        self.regions = regions;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn regions(&self) -> &ProcessRegions {
        &self.regions
    }

    /// The range searches and scans cover
    pub fn range(&self) -> AddressRange {
        self.range
    }

    pub fn set_range(&mut self, range: AddressRange) {
        info!("Search range set to {}", range);
        self.range = range;
    }

    /// Points the search range at a discovered region
    pub fn set_region(&mut self, kind: RegionKind) -> MemoryResult<AddressRange> {
        let range = self.regions.get(kind)?;
        self.set_range(range);
        Ok(range)
    }

    pub fn candidates(&self) -> Option<&CandidateSet> {
        self.filter.candidates()
    }

    /// Exact-value search over the configured range.
    ///
    /// With `refine` the matches are intersected with the existing candidate
    /// set, which must be non-empty. Invalid input fails before the backend
    /// is touched and leaves the candidate set as it was.
    #[instrument(skip(self), fields(range = %self.range))]
    pub async fn search_value(
        &mut self,
        text: &str,
        value_type: NumericType,
        refine: bool,
    ) -> MemoryResult<&CandidateSet> {
        if refine && !self.filter.has_baseline() {
            return Err(MemoryError::NoBaseline);
        }

        let value = codec::validate(text, value_type)?;
        let pattern = format_search_pattern(value, value_type)?;
        info!("Searching for {} {} as bytes {}", value, value_type, hex::encode(&pattern));

        let matches = self.backend.search(self.range, &pattern).await?;
        self.filter.apply(matches, refine)
    }

    /// Unknown-value scan of the configured range.
    ///
    /// Without a predicate this captures a fresh baseline into `current`.
    /// With one, the existing `current` becomes the baseline, a fresh scan is
    /// diffed against it and only matching samples stay in `current`. Any
    /// failure leaves the baseline in `current`.
    #[instrument(skip(self), fields(range = %self.range))]
    pub async fn scan_unknown(
        &mut self,
        value_type: NumericType,
        predicate: Option<ChangePredicate>,
    ) -> MemoryResult<ScanReport> {
        let Some(predicate) = predicate else {
            let meta = self.capture_fresh(value_type).await?;
            return Ok(ScanReport {
                value_type,
                range: self.range,
                scanned: meta.samples,
                kept: meta.samples,
                predicate: None,
            });
        };

        let baseline = self.store.meta(SnapshotSlot::Current).await?;
        if baseline.value_type != value_type || baseline.range != self.range {
            return Err(MemoryError::SnapshotMismatch(format!(
                "baseline holds {} over {}, requested {} over {}",
                baseline.value_type, baseline.range, value_type, self.range
            )));
        }

        self.store
            .promote(SnapshotSlot::Current, SnapshotSlot::Previous)
            .await?;

        match self.capture_and_diff(value_type, predicate).await {
            Ok((scanned, kept)) => {
                self.store.discard(SnapshotSlot::Previous).await?;
                self.store.discard(SnapshotSlot::Current).await?;
                self.store
                    .promote(SnapshotSlot::Temp, SnapshotSlot::Current)
                    .await?;
                Ok(ScanReport {
                    value_type,
                    range: self.range,
                    scanned,
                    kept,
                    predicate: Some(predicate),
                })
            }
            Err(e) => {
                warn!("Tracked scan failed, restoring baseline: {}", e);
                if let Err(rollback) = self.restore_baseline().await {
                    warn!("Failed to restore baseline: {}", rollback);
                }
                Err(e)
            }
        }
    }

    async fn restore_baseline(&self) -> MemoryResult<()> {
        self.store.discard(SnapshotSlot::Temp).await?;
        self.store.discard(SnapshotSlot::Current).await?;
        self.store
            .promote(SnapshotSlot::Previous, SnapshotSlot::Current)
            .await
    }

    /// Scans into `temp` and replaces `current` only once the scan is complete
    async fn capture_fresh(&self, value_type: NumericType) -> MemoryResult<SnapshotMeta> {
        let meta = self.capture(SnapshotSlot::Temp, value_type).await?;
        self.store.discard(SnapshotSlot::Current).await?;
        self.store
            .promote(SnapshotSlot::Temp, SnapshotSlot::Current)
            .await?;
        Ok(meta)
    }

    async fn capture(
        &self,
        slot: SnapshotSlot,
        value_type: NumericType,
    ) -> MemoryResult<SnapshotMeta> {
        let mut source = self.backend.open_range(self.range).await?;
        self.scanner
            .scan_into(&self.store, slot, &mut source, self.range, value_type)
            .await
    }

    async fn capture_and_diff(
        &self,
        value_type: NumericType,
        predicate: ChangePredicate,
    ) -> MemoryResult<(u64, u64)> {
        let captured = self.capture(SnapshotSlot::Current, value_type).await?;
        let filtered = self.differ.diff_slots(&self.store, predicate).await?;
        Ok((captured.samples, filtered.samples))
    }

    /// Reads the value at `address`
    pub async fn read_value(&self, address: Address, value_type: NumericType) -> MemoryResult<Value> {
        let bytes = self.backend.read_at(address, value_type.width()).await?;
        codec::decode_le(&bytes, value_type)
    }

    /// Validates `text` and writes it to `address`, returning the value written
    pub async fn write_value(
        &mut self,
        address: Address,
        text: &str,
        value_type: NumericType,
    ) -> MemoryResult<Value> {
        let value = codec::validate(text, value_type)?;
        let bytes = codec::reverse_byte_order(&codec::encode(value, value_type)?);
        self.backend.write_at(address, &bytes).await?;
        info!("Wrote {} {} to {}", value, value_type, address);
        Ok(value)
    }

    /// Deletes every persisted snapshot and forgets the candidate set
    pub async fn clear_storage(&mut self) -> MemoryResult<()> {
        self.filter.reset();
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ByteSource, MemoryImage, SearchBackend, WriteBackend};
    use crate::core::types::Sample;
    use crate::snapshot::collect_samples;
    use std::io::Cursor;
    use tempfile::TempDir;

    const BASE: u64 = 0x1000;

    /// Target whose range streams end after `limit` bytes
    struct Truncated {
        image: MemoryImage,
        limit: usize,
    }

    impl ByteSource for Truncated {
        type Reader = Cursor<Vec<u8>>;

        async fn open_range(&self, range: AddressRange) -> MemoryResult<Self::Reader> {
            let mut bytes = self.image.read_at(range.start, range.len() as usize).await?;
            bytes.truncate(self.limit);
            Ok(Cursor::new(bytes))
        }

        async fn read_at(&self, address: Address, len: usize) -> MemoryResult<Vec<u8>> {
            self.image.read_at(address, len).await
        }
    }

    impl SearchBackend for Truncated {
        async fn search(&self, range: AddressRange, pattern: &[u8]) -> MemoryResult<Vec<Address>> {
            self.image.search(range, pattern).await
        }
    }

    impl WriteBackend for Truncated {
        async fn write_at(&mut self, address: Address, bytes: &[u8]) -> MemoryResult<()> {
            self.image.write_at(address, bytes).await
        }
    }

    fn truncated_session(dir: &TempDir, words: &[u32], limit: usize) -> ScanSession<Truncated> {
        let image = MemoryImage::from_words(Address::new(BASE), words);
        let range = image.range();
        ScanSession::new(Truncated { image, limit }, SnapshotStore::new(dir.path()), range)
    }

    fn session(dir: &TempDir, words: &[u32]) -> ScanSession<MemoryImage> {
        let image = MemoryImage::from_words(Address::new(BASE), words);
        let range = image.range();
        ScanSession::new(image, SnapshotStore::new(dir.path()), range).with_options(ScanOptions {
            chunk_size: 6,
            flush_threshold: 2,
        })
    }

    async fn current(session: &ScanSession<MemoryImage>) -> Vec<(u64, Value)> {
        let mut reader = session.store().read_stream(SnapshotSlot::Current).await.unwrap();
        collect_samples(&mut reader)
            .await
            .unwrap()
            .into_iter()
            .map(|Sample { address, value }| (address.0, value))
            .collect()
    }

    #[tokio::test]
    async fn test_tracked_scan_narrows_current() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[1, 2, 3, 4]);

        let report = session.scan_unknown(NumericType::Unsigned32, None).await.unwrap();
        assert_eq!(report.kept, 4);

        let image = session.backend_mut();
        image.set_word(Address::new(BASE + 4), 5).unwrap();
        image.set_word(Address::new(BASE + 12), 9).unwrap();

        let report = session
            .scan_unknown(NumericType::Unsigned32, Some(ChangePredicate::GreaterThan))
            .await
            .unwrap();
        assert_eq!(report.scanned, 4);
        assert_eq!(report.kept, 2);
        assert_eq!(
            current(&session).await,
            vec![(BASE + 4, Value::U32(5)), (BASE + 12, Value::U32(9))]
        );
        assert!(matches!(
            session.store().meta(SnapshotSlot::Previous).await,
            Err(MemoryError::NotFound(_))
        ));
        assert!(matches!(
            session.store().meta(SnapshotSlot::Temp).await,
            Err(MemoryError::NotFound(_))
        ));

        // Nothing changed since: equality keeps both
        let report = session
            .scan_unknown(NumericType::Unsigned32, Some(ChangePredicate::Equal))
            .await
            .unwrap();
        assert_eq!(report.kept, 2);
    }

    #[tokio::test]
    async fn test_tracked_scan_without_baseline() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[1, 2]);

        let result = session
            .scan_unknown(NumericType::Unsigned32, Some(ChangePredicate::NotEqual))
            .await;
        assert!(matches!(result, Err(MemoryError::NotFound(_))));
        assert!(matches!(
            session.store().meta(SnapshotSlot::Current).await,
            Err(MemoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_tracked_scan_rejects_other_type() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[1, 2]);
        session.scan_unknown(NumericType::Unsigned32, None).await.unwrap();

        let result = session
            .scan_unknown(NumericType::Float32, Some(ChangePredicate::Equal))
            .await;
        assert!(matches!(result, Err(MemoryError::SnapshotMismatch(_))));
        assert_eq!(current(&session).await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_capture_restores_baseline() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[1, 2, 3, 4]);
        session.scan_unknown(NumericType::Unsigned32, None).await.unwrap();

        // Shrink the target under the session so the fresh scan cannot read the range
        let range = session.range();
        let image = MemoryImage::from_words(Address::new(BASE), &[1, 2]);
        let mut session = ScanSession::new(image, SnapshotStore::new(dir.path()), range);

        let result = session
            .scan_unknown(NumericType::Unsigned32, Some(ChangePredicate::Equal))
            .await;
        assert!(result.is_err());
        assert_eq!(
            current(&session).await,
            vec![
                (BASE, Value::U32(1)),
                (BASE + 4, Value::U32(2)),
                (BASE + 8, Value::U32(3)),
                (BASE + 12, Value::U32(4)),
            ]
        );
    }

    #[tokio::test]
    async fn test_aborted_fresh_scan_keeps_current() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[1, 2, 3]);
        session.scan_unknown(NumericType::Unsigned32, None).await.unwrap();

        let mut rescan = truncated_session(&dir, &[7, 8, 9], 6);
        let result = rescan.scan_unknown(NumericType::Unsigned32, None).await;
        assert!(matches!(result, Err(MemoryError::ShortRead { .. })));

        assert_eq!(
            current(&session).await,
            vec![
                (BASE, Value::U32(1)),
                (BASE + 4, Value::U32(2)),
                (BASE + 8, Value::U32(3)),
            ]
        );
        assert!(matches!(
            session.store().meta(SnapshotSlot::Temp).await,
            Err(MemoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_tracked_scan_returns_scan_error() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[1, 2, 3]);
        session.scan_unknown(NumericType::Unsigned32, None).await.unwrap();

        let mut rescan = truncated_session(&dir, &[1, 2, 3], 6);
        let result = rescan
            .scan_unknown(NumericType::Unsigned32, Some(ChangePredicate::Equal))
            .await;
        assert!(matches!(result, Err(MemoryError::ShortRead { .. })));
        assert_eq!(current(&session).await.len(), 3);
        assert!(matches!(
            session.store().meta(SnapshotSlot::Previous).await,
            Err(MemoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_and_refine() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[7, 2, 7, 2]);

        assert!(matches!(
            session.search_value("2", NumericType::Unsigned32, true).await,
            Err(MemoryError::NoBaseline)
        ));

        let found = session
            .search_value("2", NumericType::Unsigned32, false)
            .await
            .unwrap();
        assert_eq!(found.as_slice(), &[Address::new(BASE + 4), Address::new(BASE + 12)]);

        session
            .backend_mut()
            .set_word(Address::new(BASE + 4), 3)
            .unwrap();
        let refined = session
            .search_value("2", NumericType::Unsigned32, true)
            .await
            .unwrap();
        assert_eq!(refined.as_slice(), &[Address::new(BASE + 12)]);
    }

    #[tokio::test]
    async fn test_invalid_search_keeps_candidates() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[2, 2]);
        session.search_value("2", NumericType::Unsigned32, false).await.unwrap();

        let result = session.search_value("-1", NumericType::Unsigned32, true).await;
        assert!(matches!(result, Err(MemoryError::OutOfRange { .. })));
        assert_eq!(session.candidates().map(CandidateSet::len), Some(2));
    }

    #[tokio::test]
    async fn test_read_and_write_value() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir, &[0, 0]);

        let written = session
            .write_value(Address::new(BASE + 4), "-2", NumericType::Signed32)
            .await
            .unwrap();
        assert_eq!(written, Value::I32(-2));
        assert_eq!(
            session.read_value(Address::new(BASE + 4), NumericType::Signed32).await.unwrap(),
            Value::I32(-2)
        );
        assert_eq!(
            session.read_value(Address::new(BASE + 4), NumericType::Unsigned32).await.unwrap(),
            Value::U32(u32::MAX - 1)
        );
    }

    #[tokio::test]
    async fn test_set_region() {
        let dir = TempDir::new().unwrap();
        let heap = AddressRange::new(Address::new(0x2000), Address::new(0x3000)).unwrap();
        let mut session = session(&dir, &[0]).with_regions(ProcessRegions {
            stack: None,
            heap: Some(heap),
        });

        assert_eq!(session.set_region(RegionKind::Heap).unwrap(), heap);
        assert_eq!(session.range(), heap);
        assert!(matches!(
            session.set_region(RegionKind::Stack),
            Err(MemoryError::RegionNotFound(_))
        ));
        assert_eq!(session.range(), heap);
    }

    #[tokio::test]
    async fn test_clear_storage() {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("local");
        let image = MemoryImage::from_words(Address::new(BASE), &[1, 2]);
        let range = image.range();
        let mut session = ScanSession::new(image, SnapshotStore::new(&storage), range);

        session.scan_unknown(NumericType::Unsigned32, None).await.unwrap();
        session.search_value("1", NumericType::Unsigned32, false).await.unwrap();
        assert!(storage.exists());

        session.clear_storage().await.unwrap();
        assert!(!storage.exists());
        assert!(session.candidates().is_none());
    }
}
