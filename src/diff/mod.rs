//! Streaming snapshot diff
//!
//! A single forward merge-join by address over two ascending snapshots. Every
//! address of the previous snapshot must appear in the current one: the
//! current side is always a full scan of the same range, while the previous
//! side may already be a filtered subset of an earlier scan.
//!
//! The current cursor cannot rewind, so a previous address that the cursor
//! runs past (or runs out before reaching) could never be matched. That is
//! reported as [`MemoryError::MergeExhausted`] instead of silently yielding a
//! shorter result.

use crate::core::types::{ChangePredicate, MemoryError, MemoryResult, Sample};
use crate::snapshot::{SampleSink, SampleSource, SnapshotMeta, SnapshotSlot, SnapshotStore};
use tracing::{debug, info, instrument, warn};

/// Default number of matches buffered before they are written out
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1000;

/// Lazy merge-join of two sample sequences, yielding the current samples
/// whose value satisfies the predicate against the previous value
pub struct MergeDiff<'a, P, C> {
    previous: &'a mut P,
    current: &'a mut C,
    predicate: ChangePredicate,
    compared: u64,
    matched: u64,
}

impl<'a, P, C> MergeDiff<'a, P, C>
where
    P: SampleSource,
    C: SampleSource,
{
    pub fn new(previous: &'a mut P, current: &'a mut C, predicate: ChangePredicate) -> Self {
        MergeDiff {
            previous,
            current,
            predicate,
            compared: 0,
            matched: 0,
        }
    }

    /// Address pairs compared so far
    pub fn compared(&self) -> u64 {
        self.compared
    }

    /// Samples yielded so far
    pub fn matched(&self) -> u64 {
        self.matched
    }

    async fn find_current(&mut self, previous: &Sample) -> MemoryResult<Sample> {
        loop {
            let Some(current) = self.current.next_sample().await? else {
                warn!(
                    "Current values ended before previous values at {}",
                    previous.address
                );
                return Err(MemoryError::merge_exhausted(previous.address, self.matched));
            };

            if current.address == previous.address {
                return Ok(current);
            }
            if current.address > previous.address {
                warn!(
                    "Current values skipped {} (next is {})",
                    previous.address, current.address
                );
                return Err(MemoryError::merge_exhausted(previous.address, self.matched));
            }
        }
    }
}

impl<P, C> SampleSource for MergeDiff<'_, P, C>
where
    P: SampleSource,
    C: SampleSource,
{
    async fn next_sample(&mut self) -> MemoryResult<Option<Sample>> {
        while let Some(previous) = self.previous.next_sample().await? {
            let current = self.find_current(&previous).await?;
            self.compared += 1;

            if self.predicate.holds(&current.value, &previous.value) {
                self.matched += 1;
                return Ok(Some(current));
            }
        }
        Ok(None)
    }
}

/// Outcome of one diff pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffReport {
    pub compared: u64,
    pub kept: u64,
}

/// Runs merge diffs, writing output in bounded batches
#[derive(Debug, Clone)]
pub struct DiffEngine {
    flush_threshold: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        DiffEngine::new(DEFAULT_FLUSH_THRESHOLD)
    }
}

impl DiffEngine {
    pub fn new(flush_threshold: usize) -> Self {
        DiffEngine {
            flush_threshold: flush_threshold.max(1),
        }
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Diffs `previous` against `current` into `sink`; at most
    /// `flush_threshold` matches are held in memory at once
    pub async fn run<P, C, S>(
        &self,
        previous: &mut P,
        current: &mut C,
        predicate: ChangePredicate,
        sink: &mut S,
    ) -> MemoryResult<DiffReport>
    where
        P: SampleSource,
        C: SampleSource,
        S: SampleSink,
    {
        let mut merge = MergeDiff::new(previous, current, predicate);
        let mut pending: Vec<Sample> = Vec::with_capacity(self.flush_threshold);

        while let Some(sample) = merge.next_sample().await? {
            pending.push(sample);
            if pending.len() >= self.flush_threshold {
                sink.append(&pending).await?;
                pending.clear();
            }
        }
        if !pending.is_empty() {
            sink.append(&pending).await?;
        }

        Ok(DiffReport {
            compared: merge.compared(),
            kept: merge.matched(),
        })
    }

    /// Diffs the `previous` slot against `current` into `temp`.
    ///
    /// Both slots must be complete snapshots of the same type and range.
    /// On failure `temp` is discarded; `previous` and `current` are never
    /// modified here.
    #[instrument(skip(self, store))]
    pub async fn diff_slots(
        &self,
        store: &SnapshotStore,
        predicate: ChangePredicate,
    ) -> MemoryResult<SnapshotMeta> {
        let previous_meta = store.meta(SnapshotSlot::Previous).await?;
        let current_meta = store.meta(SnapshotSlot::Current).await?;
        if !previous_meta.compatible_with(&current_meta) {
            return Err(MemoryError::SnapshotMismatch(format!(
                "baseline is {} over {}, new scan is {} over {}",
                previous_meta.value_type,
                previous_meta.range,
                current_meta.value_type,
                current_meta.range
            )));
        }

        let mut previous = store.read_stream(SnapshotSlot::Previous).await?;
        let mut current = store.read_stream(SnapshotSlot::Current).await?;
        let mut writer = store
            .begin_write(SnapshotSlot::Temp, current_meta.value_type, current_meta.range)
            .await?;
        debug!("Using {} to temporarily store filtered values", SnapshotSlot::Temp);

        let outcome = match self.run(&mut previous, &mut current, predicate, &mut writer).await {
            Ok(report) => writer.finish().await.map(|meta| (report, meta)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((report, meta)) => {
                info!(
                    "Kept {} of {} values changed '{}' from previous",
                    report.kept, report.compared, predicate
                );
                Ok(meta)
            }
            Err(e) => {
                store.discard(SnapshotSlot::Temp).await?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, AddressRange, NumericType, Value};
    use crate::snapshot::collect_samples;
    use tempfile::TempDir;

    fn snap(pairs: &[(u64, u32)]) -> Vec<Sample> {
        pairs
            .iter()
            .map(|(a, v)| Sample::new(Address::new(*a), Value::U32(*v)))
            .collect()
    }

    async fn diff(
        previous: &[(u64, u32)],
        current: &[(u64, u32)],
        predicate: ChangePredicate,
    ) -> MemoryResult<Vec<Sample>> {
        let mut previous = snap(previous).into_iter();
        let mut current = snap(current).into_iter();
        let mut out: Vec<Sample> = Vec::new();
        DiffEngine::default()
            .run(&mut previous, &mut current, predicate, &mut out)
            .await?;
        Ok(out)
    }

    const PREVIOUS: [(u64, u32); 3] = [(0x1000, 1), (0x1004, 2), (0x1008, 3)];
    const CURRENT: [(u64, u32); 3] = [(0x1000, 1), (0x1004, 5), (0x1008, 3)];

    #[tokio::test]
    async fn test_greater_than() {
        let out = diff(&PREVIOUS, &CURRENT, ChangePredicate::GreaterThan).await.unwrap();
        assert_eq!(out, snap(&[(0x1004, 5)]));
    }

    #[tokio::test]
    async fn test_equal() {
        let out = diff(&PREVIOUS, &CURRENT, ChangePredicate::Equal).await.unwrap();
        assert_eq!(out, snap(&[(0x1000, 1), (0x1008, 3)]));
    }

    #[tokio::test]
    async fn test_less_and_not_equal() {
        let out = diff(&PREVIOUS, &CURRENT, ChangePredicate::LessThan).await.unwrap();
        assert!(out.is_empty());
        let out = diff(&PREVIOUS, &CURRENT, ChangePredicate::NotEqual).await.unwrap();
        assert_eq!(out, snap(&[(0x1004, 5)]));
    }

    #[tokio::test]
    async fn test_filtered_previous_subset() {
        let previous = [(0x1004, 2)];
        let out = diff(&previous, &CURRENT, ChangePredicate::GreaterThan).await.unwrap();
        assert_eq!(out, snap(&[(0x1004, 5)]));
    }

    #[tokio::test]
    async fn test_exhausted_current_is_an_error() {
        let current = [(0x1000, 1), (0x1004, 5)];
        match diff(&PREVIOUS, &current, ChangePredicate::GreaterThan).await {
            Err(MemoryError::MergeExhausted { address, emitted }) => {
                assert_eq!(address, "0x1008");
                assert_eq!(emitted, 1);
            }
            other => panic!("expected MergeExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skipped_address_is_an_error() {
        let current = [(0x1000, 1), (0x1008, 3)];
        assert!(matches!(
            diff(&PREVIOUS, &current, ChangePredicate::Equal).await,
            Err(MemoryError::MergeExhausted { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_previous_yields_nothing() {
        let out = diff(&[], &CURRENT, ChangePredicate::NotEqual).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_output_is_flushed_in_bounded_batches() {
        struct BatchRecorder(Vec<usize>);
        impl SampleSink for BatchRecorder {
            async fn append(&mut self, samples: &[Sample]) -> MemoryResult<()> {
                self.0.push(samples.len());
                Ok(())
            }
        }

        let pairs: Vec<(u64, u32)> = (0..25).map(|i| (0x2000 + 4 * i, i as u32)).collect();
        let mut previous = snap(&pairs).into_iter();
        let mut current = snap(&pairs).into_iter();
        let mut recorder = BatchRecorder(Vec::new());

        let report = DiffEngine::new(10)
            .run(&mut previous, &mut current, ChangePredicate::Equal, &mut recorder)
            .await
            .unwrap();

        assert_eq!(report, DiffReport { compared: 25, kept: 25 });
        assert_eq!(recorder.0, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn test_merge_diff_is_lazy_source() {
        let mut previous = snap(&PREVIOUS).into_iter();
        let mut current = snap(&CURRENT).into_iter();
        let mut merge = MergeDiff::new(&mut previous, &mut current, ChangePredicate::Equal);

        assert_eq!(
            merge.next_sample().await.unwrap(),
            Some(Sample::new(Address::new(0x1000), Value::U32(1)))
        );
        assert_eq!(merge.compared(), 1);
        let rest = collect_samples(&mut merge).await.unwrap();
        assert_eq!(rest, snap(&[(0x1008, 3)]));
        assert_eq!(merge.compared(), 3);
    }

    async fn write_slot(
        store: &SnapshotStore,
        slot: SnapshotSlot,
        range: AddressRange,
        pairs: &[(u64, u32)],
    ) {
        let mut writer = store
            .begin_write(slot, NumericType::Unsigned32, range)
            .await
            .unwrap();
        writer.append(&snap(pairs)).await.unwrap();
        writer.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_diff_slots_writes_temp() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let range = AddressRange::new(Address::new(0x1000), Address::new(0x100C)).unwrap();
        write_slot(&store, SnapshotSlot::Previous, range, &PREVIOUS).await;
        write_slot(&store, SnapshotSlot::Current, range, &CURRENT).await;

        let meta = DiffEngine::default()
            .diff_slots(&store, ChangePredicate::GreaterThan)
            .await
            .unwrap();
        assert_eq!(meta.samples, 1);

        let mut reader = store.read_stream(SnapshotSlot::Temp).await.unwrap();
        assert_eq!(collect_samples(&mut reader).await.unwrap(), snap(&[(0x1004, 5)]));
    }

    #[tokio::test]
    async fn test_diff_slots_requires_matching_snapshots() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let range = AddressRange::new(Address::new(0x1000), Address::new(0x100C)).unwrap();
        let other = AddressRange::new(Address::new(0x1000), Address::new(0x1010)).unwrap();
        write_slot(&store, SnapshotSlot::Previous, range, &PREVIOUS).await;
        write_slot(&store, SnapshotSlot::Current, other, &CURRENT).await;

        assert!(matches!(
            DiffEngine::default().diff_slots(&store, ChangePredicate::Equal).await,
            Err(MemoryError::SnapshotMismatch(_))
        ));
        assert!(matches!(
            store.meta(SnapshotSlot::Temp).await,
            Err(MemoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_diff_slots_without_baseline() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let range = AddressRange::new(Address::new(0x1000), Address::new(0x100C)).unwrap();
        write_slot(&store, SnapshotSlot::Current, range, &CURRENT).await;

        assert!(matches!(
            DiffEngine::default().diff_slots(&store, ChangePredicate::Equal).await,
            Err(MemoryError::NotFound(_))
        ));
        let mut reader = store.read_stream(SnapshotSlot::Current).await.unwrap();
        assert_eq!(collect_samples(&mut reader).await.unwrap(), snap(&CURRENT));
    }
}
