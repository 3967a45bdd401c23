//! Live process memory through `/proc/<pid>/mem`

use super::{ByteSource, SearchBackend, WriteBackend};
use crate::core::types::{Address, AddressRange, MemoryError, MemoryResult};
use crate::scan::DEFAULT_CHUNK_SIZE;
use crate::search::search_stream;
use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, Take};
use tracing::{debug, info};

/// Handle on another process's address space.
///
/// Reading and writing need ptrace access to the target (same user with
/// `kernel.yama.ptrace_scope` at 0, or `CAP_SYS_PTRACE`).
#[derive(Debug, Clone)]
pub struct ProcMemory {
    pid: u32,
    path: PathBuf,
    chunk_size: usize,
}

impl ProcMemory {
    /// Attaches to `pid`, failing if the process does not exist
    pub async fn attach(pid: u32) -> MemoryResult<Self> {
        let proc_dir = PathBuf::from(format!("/proc/{}", pid));
        match fs::metadata(&proc_dir).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MemoryError::ProcessNotFound(pid.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        info!("Attached to process {}", pid);
        Ok(ProcMemory {
            pid,
            path: proc_dir.join("mem"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Sets how many bytes a streaming search reads at once
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    async fn open_at(&self, address: Address) -> MemoryResult<File> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(address.0)).await?;
        Ok(file)
    }
}

impl ByteSource for ProcMemory {
    type Reader = Take<File>;

    async fn open_range(&self, range: AddressRange) -> MemoryResult<Self::Reader> {
        let file = self.open_at(range.start).await?;
        debug!(pid = self.pid, %range, "Opened memory range");
        Ok(file.take(range.len()))
    }

    async fn read_at(&self, address: Address, len: usize) -> MemoryResult<Vec<u8>> {
        let mut file = self.open_at(address).await?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer).await.map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => MemoryError::InvalidAddress(format!(
                "{} is not readable for {} bytes",
                address, len
            )),
            _ => MemoryError::from(e),
        })?;
        Ok(buffer)
    }
}

impl SearchBackend for ProcMemory {
    async fn search(&self, range: AddressRange, pattern: &[u8]) -> MemoryResult<Vec<Address>> {
        let mut reader = self.open_range(range).await?;
        search_stream(&mut reader, range.start, pattern, self.chunk_size).await
    }
}

impl WriteBackend for ProcMemory {
    async fn write_at(&mut self, address: Address, bytes: &[u8]) -> MemoryResult<()> {
        let mut file = OpenOptions::new().write(true).open(&self.path).await?;
        file.seek(SeekFrom::Start(address.0)).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        debug!(pid = self.pid, %address, len = bytes.len(), "Wrote memory");
        Ok(())
    }
}
