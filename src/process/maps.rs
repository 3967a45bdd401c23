//! `/proc/<pid>/maps` parsing
//!
//! Each line reads `start-end perms offset dev inode [pathname]`, with the
//! bounds in bare hex. The stack and heap carry the `[stack]` and `[heap]`
//! pseudo-paths.

use crate::core::types::{Address, AddressRange, MemoryError, MemoryResult};
use std::fmt;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Memory regions a scan range can be set to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Stack,
    Heap,
}

impl RegionKind {
    /// The pseudo-path marking the region in the maps file
    pub const fn marker(&self) -> &'static str {
        match self {
            RegionKind::Stack => "[stack]",
            RegionKind::Heap => "[heap]",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Stack => write!(f, "stack"),
            RegionKind::Heap => write!(f, "heap"),
        }
    }
}

impl FromStr for RegionKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stack" => Ok(RegionKind::Stack),
            "heap" => Ok(RegionKind::Heap),
            other => Err(MemoryError::InvalidCommand(format!("Unknown region: {}", other))),
        }
    }
}

/// One mapping from the maps file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub range: AddressRange,
    pub permissions: String,
    pub pathname: Option<String>,
}

impl MapEntry {
    pub fn is_readable(&self) -> bool {
        self.permissions.starts_with('r')
    }

    pub fn is_writable(&self) -> bool {
        self.permissions.as_bytes().get(1) == Some(&b'w')
    }
}

fn parse_bound(text: &str) -> MemoryResult<Address> {
    u64::from_str_radix(text, 16)
        .map(Address::new)
        .map_err(|_| MemoryError::InvalidAddress(text.to_string()))
}

/// Parses one maps line
pub fn parse_line(line: &str) -> MemoryResult<MapEntry> {
    let mut fields = line.split_whitespace();
    let bounds = fields
        .next()
        .ok_or_else(|| MemoryError::InvalidRange("Empty maps line".to_string()))?;
    let (start, end) = bounds
        .split_once('-')
        .ok_or_else(|| MemoryError::InvalidRange(bounds.to_string()))?;
    let range = AddressRange::new(parse_bound(start)?, parse_bound(end)?)?;
    let permissions = fields.next().unwrap_or_default().to_string();

    // offset, device and inode
    let pathname = fields.nth(3).map(|first| {
        let rest: Vec<&str> = fields.collect();
        if rest.is_empty() {
            first.to_string()
        } else {
            format!("{} {}", first, rest.join(" "))
        }
    });

    Ok(MapEntry {
        range,
        permissions,
        pathname,
    })
}

/// Parses a whole maps file, skipping blank lines
pub fn parse_maps(text: &str) -> MemoryResult<Vec<MapEntry>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

/// Range of the first mapping tagged as `kind`
pub fn find_region(text: &str, kind: RegionKind) -> MemoryResult<AddressRange> {
    parse_maps(text)?
        .into_iter()
        .find(|entry| entry.pathname.as_deref() == Some(kind.marker()))
        .map(|entry| entry.range)
        .ok_or_else(|| MemoryError::RegionNotFound(kind.marker().to_string()))
}

/// Stack and heap of a process, where present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessRegions {
    pub stack: Option<AddressRange>,
    pub heap: Option<AddressRange>,
}

impl ProcessRegions {
    /// Extracts both regions from maps text
    pub fn from_maps(text: &str) -> MemoryResult<Self> {
        let lookup = |kind| match find_region(text, kind) {
            Ok(range) => Ok(Some(range)),
            Err(MemoryError::RegionNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        };
        Ok(ProcessRegions {
            stack: lookup(RegionKind::Stack)?,
            heap: lookup(RegionKind::Heap)?,
        })
    }

    /// Reads and parses `/proc/<pid>/maps`
    pub async fn discover(pid: u32) -> MemoryResult<Self> {
        let path = format!("/proc/{}/maps", pid);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MemoryError::ProcessNotFound(pid.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(pid, lines = text.lines().count(), "Read memory maps");

        let regions = ProcessRegions::from_maps(&text)?;
        if let Some(stack) = regions.stack {
            info!("Stack located in: {}", stack);
        }
        if let Some(heap) = regions.heap {
            info!("Heap located in: {}", heap);
        }
        Ok(regions)
    }

    /// The region of the given kind, or `RegionNotFound`
    pub fn get(&self, kind: RegionKind) -> MemoryResult<AddressRange> {
        let region = match kind {
            RegionKind::Stack => self.stack,
            RegionKind::Heap => self.heap,
        };
        region.ok_or_else(|| MemoryError::RegionNotFound(kind.marker().to_string()))
    }
}
