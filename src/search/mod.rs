//! Exact-value search and candidate refinement
//!
//! Each exact search yields the addresses where a value's byte pattern
//! occurs. A search from scratch replaces the candidate set; a refining
//! search intersects with it, so across refining rounds the set only
//! shrinks.

mod pattern;

pub use pattern::{find_aligned, search_stream};

use crate::codec;
use crate::core::types::{Address, MemoryError, MemoryResult, NumericType, Value};
use std::collections::HashSet;
use tracing::{debug, info};

/// Ordered set of addresses believed to hold the value being searched for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    addresses: Vec<Address>,
}

impl CandidateSet {
    /// Builds a set from search matches, keeping first occurrences in order
    pub fn from_matches(matches: Vec<Address>) -> Self {
        let mut seen = HashSet::with_capacity(matches.len());
        let addresses = matches.into_iter().filter(|a| seen.insert(*a)).collect();
        CandidateSet { addresses }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn contains(&self, address: Address) -> bool {
        self.addresses.contains(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.addresses
    }

    /// Whether every address here is also in `other`
    pub fn is_subset_of(&self, other: &CandidateSet) -> bool {
        let other: HashSet<_> = other.addresses.iter().collect();
        self.addresses.iter().all(|a| other.contains(a))
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.iter()
    }
}

/// One search round: refine intersects `candidates` with `matches` (keeping
/// the candidates' order), otherwise `matches` becomes the new set.
///
/// Refining without a non-empty candidate set fails with `NoBaseline`.
pub fn search(
    candidates: Option<&CandidateSet>,
    matches: Vec<Address>,
    refine: bool,
) -> MemoryResult<CandidateSet> {
    if !refine {
        return Ok(CandidateSet::from_matches(matches));
    }

    let candidates = candidates
        .filter(|c| !c.is_empty())
        .ok_or(MemoryError::NoBaseline)?;
    let matches: HashSet<Address> = matches.into_iter().collect();
    let addresses = candidates
        .addresses
        .iter()
        .copied()
        .filter(|a| matches.contains(a))
        .collect();

    Ok(CandidateSet { addresses })
}

/// The exact little-endian byte pattern of `value` as it sits in memory
pub fn format_search_pattern(value: Value, value_type: NumericType) -> MemoryResult<Vec<u8>> {
    let canonical = codec::encode(value, value_type)?;
    Ok(codec::reverse_byte_order(&canonical))
}

/// Session-owned candidate set across search rounds
#[derive(Debug, Default)]
pub struct CandidateFilter {
    candidates: Option<CandidateSet>,
    rounds: u32,
}

impl CandidateFilter {
    pub fn new() -> Self {
        CandidateFilter::default()
    }

    /// Whether a refining search has anything to refine
    pub fn has_baseline(&self) -> bool {
        self.candidates.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn candidates(&self) -> Option<&CandidateSet> {
        self.candidates.as_ref()
    }

    /// Searches completed since the last search from scratch
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Applies one round of matches; on error the current set is untouched
    pub fn apply(&mut self, matches: Vec<Address>, refine: bool) -> MemoryResult<&CandidateSet> {
        let found = matches.len();
        let next = search(self.candidates.as_ref(), matches, refine)?;

        self.rounds = if refine { self.rounds + 1 } else { 1 };
        debug!(found, kept = next.len(), refine, "Applied search round");
        info!("Search round {} left {} candidate addresses", self.rounds, next.len());

        Ok(&*self.candidates.insert(next))
    }

    /// Forgets all candidates
    pub fn reset(&mut self) {
        self.candidates = None;
        self.rounds = 0;
    }
}
