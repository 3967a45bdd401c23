//! Snapshot slot storage on disk

use super::{SampleReader, SampleSink, SnapshotMeta, SnapshotSlot};
use crate::core::types::{AddressRange, MemoryError, MemoryResult, NumericType, Sample};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Manages the `current`, `previous` and `temp` snapshot slots in one directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    directory: PathBuf,
}

impl SnapshotStore {
    /// Creates a store rooted at `directory`; nothing is touched until the
    /// first write
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        SnapshotStore {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the slot's sample data
    pub fn data_path(&self, slot: SnapshotSlot) -> PathBuf {
        self.directory.join(format!("{}.snap", slot.label()))
    }

    fn meta_path(&self, slot: SnapshotSlot) -> PathBuf {
        self.directory.join(format!("{}.meta", slot.label()))
    }

    /// Opens a fresh, empty snapshot in `slot`, dropping whatever it held
    pub async fn begin_write(
        &self,
        slot: SnapshotSlot,
        value_type: NumericType,
        range: AddressRange,
    ) -> MemoryResult<SnapshotWriter> {
        fs::create_dir_all(&self.directory).await?;

        // Marker first: from here on the slot reads as incomplete
        remove_if_exists(&self.meta_path(slot)).await?;
        let file = File::create(self.data_path(slot)).await?;

        debug!(slot = %slot, %value_type, %range, "Opened snapshot for writing");
        Ok(SnapshotWriter {
            slot,
            meta_path: self.meta_path(slot),
            writer: BufWriter::new(file),
            line: String::new(),
            meta: SnapshotMeta {
                value_type,
                samples: 0,
                range,
            },
        })
    }

    /// Completion marker of `slot`.
    ///
    /// Fails with `NotFound` if nothing was ever written there and with
    /// `Incomplete` if sample data exists without a marker.
    pub async fn meta(&self, slot: SnapshotSlot) -> MemoryResult<SnapshotMeta> {
        match fs::read_to_string(self.meta_path(slot)).await {
            Ok(text) => toml::from_str(&text).map_err(|e| {
                MemoryError::corrupt_snapshot(slot, 0, format!("bad completion marker: {}", e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if exists(&self.data_path(slot)).await? {
                    Err(MemoryError::Incomplete(slot.to_string()))
                } else {
                    Err(MemoryError::NotFound(slot.to_string()))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `slot` holds a complete snapshot
    pub async fn is_complete(&self, slot: SnapshotSlot) -> bool {
        self.meta(slot).await.is_ok()
    }

    /// Opens a complete snapshot for a single sequential pass
    pub async fn read_stream(&self, slot: SnapshotSlot) -> MemoryResult<SampleReader> {
        let meta = self.meta(slot).await?;
        let file = File::open(self.data_path(slot)).await?;
        Ok(SampleReader::new(slot, file, meta.value_type))
    }

    /// Moves the complete snapshot in `from` to `to`, replacing `to`
    pub async fn promote(&self, from: SnapshotSlot, to: SnapshotSlot) -> MemoryResult<()> {
        self.meta(from).await?;

        // `to` must never look complete while holding `from`'s data halfway
        remove_if_exists(&self.meta_path(to)).await?;
        fs::rename(self.data_path(from), self.data_path(to)).await?;
        fs::rename(self.meta_path(from), self.meta_path(to)).await?;

        info!("Moved {} snapshot to {}", from, to);
        Ok(())
    }

    /// Deletes whatever `slot` holds, complete or not
    pub async fn discard(&self, slot: SnapshotSlot) -> MemoryResult<()> {
        remove_if_exists(&self.meta_path(slot)).await?;
        remove_if_exists(&self.data_path(slot)).await?;
        debug!(slot = %slot, "Discarded snapshot");
        Ok(())
    }

    /// Deletes the whole storage directory
    pub async fn clear(&self) -> MemoryResult<()> {
        match fs::remove_dir_all(&self.directory).await {
            Ok(()) => {
                info!("Removed snapshot directory {}", self.directory.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Appends samples to a slot opened by [`SnapshotStore::begin_write`].
///
/// Dropping the writer without calling [`finish`](Self::finish) leaves the
/// slot incomplete.
pub struct SnapshotWriter {
    slot: SnapshotSlot,
    meta_path: PathBuf,
    writer: BufWriter<File>,
    line: String,
    meta: SnapshotMeta,
}

impl SnapshotWriter {
    pub fn slot(&self) -> SnapshotSlot {
        self.slot
    }

    /// Samples appended so far
    pub fn samples(&self) -> u64 {
        self.meta.samples
    }

    /// Appends samples in the order given; ordering is the caller's job
    pub async fn append(&mut self, samples: &[Sample]) -> MemoryResult<()> {
        use std::fmt::Write;

        self.line.clear();
        for sample in samples {
            if sample.value.numeric_type() != self.meta.value_type {
                return Err(MemoryError::type_mismatch(
                    self.meta.value_type,
                    sample.value.numeric_type(),
                ));
            }
            // Writing into a String cannot fail
            let _ = writeln!(self.line, "{}", sample);
        }
        self.writer.write_all(self.line.as_bytes()).await?;
        self.meta.samples += samples.len() as u64;
        Ok(())
    }

    /// Flushes the data and writes the completion marker
    pub async fn finish(mut self) -> MemoryResult<SnapshotMeta> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await?;

        let text = toml::to_string(&self.meta).map_err(|e| {
            MemoryError::corrupt_snapshot(self.slot, 0, format!("cannot encode marker: {}", e))
        })?;
        let tmp_path = self.meta_path.with_extension("meta.tmp");
        fs::write(&tmp_path, text).await?;
        fs::rename(&tmp_path, &self.meta_path).await?;

        debug!(slot = %self.slot, samples = self.meta.samples, "Snapshot complete");
        Ok(self.meta)
    }
}

impl SampleSink for SnapshotWriter {
    async fn append(&mut self, samples: &[Sample]) -> MemoryResult<()> {
        SnapshotWriter::append(self, samples).await
    }
}

async fn exists(path: &Path) -> MemoryResult<bool> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> MemoryResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
