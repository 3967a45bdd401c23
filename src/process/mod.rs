//! Process inspection for Linux targets
//!
//! Locates the stack and heap of a running process so scans can be pointed
//! at them.

pub mod maps;

pub use maps::{find_region, parse_maps, MapEntry, ProcessRegions, RegionKind};
