//! Persisted snapshots
//!
//! A snapshot is an address-ordered sequence of samples, stored one per line
//! as `0x<address-hex> <value-decimal>` in one of three named slots. Each
//! slot also carries a small TOML completion marker, written only once the
//! snapshot is fully persisted, so a scan that was interrupted half way can
//! never be mistaken for a complete one.

mod reader;
mod store;

pub use reader::{parse_line, SampleReader};
pub use store::{SnapshotStore, SnapshotWriter};

use crate::core::types::{AddressRange, MemoryResult, NumericType, Sample};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named snapshot slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotSlot {
    /// Latest (possibly filtered) snapshot
    Current,
    /// Baseline a tracked scan compares against
    Previous,
    /// Diff output before it is promoted to current
    Temp,
}

impl SnapshotSlot {
    pub const fn label(&self) -> &'static str {
        match self {
            SnapshotSlot::Current => "current",
            SnapshotSlot::Previous => "previous",
            SnapshotSlot::Temp => "temp",
        }
    }
}

impl fmt::Display for SnapshotSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completion marker of a fully written snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub value_type: NumericType,
    pub samples: u64,
    /// Range of the scan the snapshot (or its unfiltered ancestor) came from
    pub range: AddressRange,
}

impl SnapshotMeta {
    /// Whether a diff between snapshots with these markers is meaningful
    pub fn compatible_with(&self, other: &SnapshotMeta) -> bool {
        self.value_type == other.value_type && self.range == other.range
    }
}

/// A lazy, finite, single-pass sequence of samples in ascending address order
#[allow(async_fn_in_trait)]
pub trait SampleSource {
    /// Next sample, or `None` once the sequence is exhausted
    async fn next_sample(&mut self) -> MemoryResult<Option<Sample>>;
}

/// Destination for samples produced in ascending address order
#[allow(async_fn_in_trait)]
pub trait SampleSink {
    async fn append(&mut self, samples: &[Sample]) -> MemoryResult<()>;
}

impl SampleSource for std::vec::IntoIter<Sample> {
    async fn next_sample(&mut self) -> MemoryResult<Option<Sample>> {
        Ok(self.next())
    }
}

impl SampleSink for Vec<Sample> {
    async fn append(&mut self, samples: &[Sample]) -> MemoryResult<()> {
        self.extend_from_slice(samples);
        Ok(())
    }
}

/// Drains a source into memory. Only meant for small snapshots.
pub async fn collect_samples<S: SampleSource>(source: &mut S) -> MemoryResult<Vec<Sample>> {
    let mut samples = Vec::new();
    while let Some(sample) = source.next_sample().await? {
        samples.push(sample);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, Value};

    #[test]
    fn test_slot_labels() {
        assert_eq!(SnapshotSlot::Current.label(), "current");
        assert_eq!(SnapshotSlot::Previous.to_string(), "previous");
        assert_eq!(SnapshotSlot::Temp.label(), "temp");
    }

    #[test]
    fn test_meta_compatibility() {
        let range = AddressRange::new(Address::new(0x1000), Address::new(0x2000)).unwrap();
        let meta = SnapshotMeta {
            value_type: NumericType::Unsigned32,
            samples: 10,
            range,
        };

        let filtered = SnapshotMeta { samples: 2, ..meta.clone() };
        assert!(meta.compatible_with(&filtered));

        let other_type = SnapshotMeta {
            value_type: NumericType::Float32,
            ..meta.clone()
        };
        assert!(!meta.compatible_with(&other_type));

        let other_range = SnapshotMeta {
            range: AddressRange::new(Address::new(0x1000), Address::new(0x3000)).unwrap(),
            ..meta.clone()
        };
        assert!(!meta.compatible_with(&other_range));
    }

    #[test]
    fn test_meta_toml_roundtrip() {
        let meta = SnapshotMeta {
            value_type: NumericType::Signed32,
            samples: 3,
            range: AddressRange::new(Address::new(0x1000), Address::new(0x100c)).unwrap(),
        };
        let text = toml::to_string(&meta).unwrap();
        assert_eq!(toml::from_str::<SnapshotMeta>(&text).unwrap(), meta);
    }

    #[tokio::test]
    async fn test_vec_source_and_sink() {
        let samples = vec![
            Sample::new(Address::new(0x10), Value::U32(1)),
            Sample::new(Address::new(0x14), Value::U32(2)),
        ];
        let mut source = samples.clone().into_iter();
        let collected = collect_samples(&mut source).await.unwrap();
        assert_eq!(collected, samples);

        let mut sink: Vec<Sample> = Vec::new();
        SampleSink::append(&mut sink, &collected).await.unwrap();
        assert_eq!(sink.len(), 2);
    }
}
