/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Phase table: greedy nearest-neighbour classification of interval signatures.
//!
//! - [`PhaseTable`]: ordered store of known phase signatures with per-phase
//!   occurrence, last-match and reuse-distance tracking.
//! - [`PhaseClassifier`]: the seam the tracer classifies through, implemented
//!   by the owned table and (with `std`) by the lock-guarded shared table.
//!
//! # Algorithm
//!
//! ```text
//! find(sig):
//!   interval += 1
//!   best = argmin_e  Σ|e.sig[i] − sig[i]| / sig.magnitude      (table order)
//!   if best.distance < threshold  → matched: count, reuse distance, last match
//!   else                           → new entry (evicting LRU when at capacity)
//! ```
//!
//! # Invariants
//!
//! - **PT-001**: ties on minimum distance go to the earliest entry in table
//!   order; the scan is a plain in-order walk, so results are deterministic.
//! - **PT-002**: phase ids are assigned sequentially from 1 and never reused,
//!   even after an entry is evicted.
//! - **PT-003**: every stored signature has the same length; a probe of a
//!   different length is rejected before any state changes.
//! - **PT-004**: with a capacity set, `len() <= capacity` after every `find`.

use alloc::vec::Vec;
use core::fmt;

use crate::error::PhaseError;
use crate::signature::{normalized_distance, Signature};

// ─── PhaseId ────────────────────────────────────────────────────────────────

/// Stable identifier of a discovered phase. The first phase is `PhaseId(1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseId(pub u32);

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── PhaseEntry ─────────────────────────────────────────────────────────────

/// One known phase.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseEntry {
    /// Phase identifier.
    pub id: PhaseId,
    /// Signature of the interval that created this phase.
    pub signature: Signature,
    /// Intervals classified as this phase, the creating interval included.
    pub occurrences: u64,
    /// Interval index of the most recent match (or of creation).
    pub last_match: u64,
    /// Intervals between the two most recent matches; 0 until matched again.
    pub reuse_distance: u64,
}

// ─── PhaseMatch ─────────────────────────────────────────────────────────────

/// Result of classifying one interval.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseMatch {
    /// Phase the interval was assigned to.
    pub id: PhaseId,
    /// `true` when a new entry was created for this interval.
    pub is_new: bool,
    /// Interval index (1-based) this decision was made for.
    pub interval: u64,
    /// Distance to the nearest existing entry; `None` for an empty table.
    pub distance: Option<f64>,
    /// Reuse distance recorded on a match; `None` for a new phase.
    pub reuse_distance: Option<u64>,
    /// Phase evicted to make room for a new entry, if any.
    pub evicted: Option<PhaseId>,
}

// ─── PhaseClassifier ────────────────────────────────────────────────────────

/// Anything that can assign a phase id to an interval signature.
pub trait PhaseClassifier {
    /// Classify `signature`, updating classifier state.
    fn classify(&mut self, signature: Signature) -> Result<PhaseMatch, PhaseError>;
}

impl<C: PhaseClassifier + ?Sized> PhaseClassifier for &mut C {
    fn classify(&mut self, signature: Signature) -> Result<PhaseMatch, PhaseError> {
        (**self).classify(signature)
    }
}

// ─── PhaseTable ─────────────────────────────────────────────────────────────

/// Ordered table of known phases with an optional LRU capacity.
#[derive(Clone, Debug)]
pub struct PhaseTable {
    entries: Vec<PhaseEntry>,
    threshold: f64,
    capacity: Option<usize>,
    interval: u64,
    next_id: u32,
    evictions: u64,
}

impl PhaseTable {
    /// Construct an empty, unbounded table.
    ///
    /// `threshold` is a normalized Manhattan distance in `[0, 1]`; an interval
    /// matches a phase when its distance is strictly below it.
    pub fn new(threshold: f64) -> Result<Self, PhaseError> {
        Self::with_capacity(threshold, None)
    }

    /// Construct an empty table that evicts the least-recently-matched entry
    /// once `capacity` entries are stored. `None` means unbounded.
    pub fn with_capacity(threshold: f64, capacity: Option<usize>) -> Result<Self, PhaseError> {
        check_threshold(threshold)?;
        if capacity == Some(0) {
            return Err(PhaseError::InvalidConfig("phase table capacity must be non-zero"));
        }
        Ok(Self {
            entries: Vec::new(),
            threshold,
            capacity,
            interval: 0,
            next_id: 1,
            evictions: 0,
        })
    }

    /// Rebuild a table from previously captured state.
    pub(crate) fn from_parts(
        threshold: f64,
        capacity: Option<usize>,
        interval: u64,
        next_id: u32,
        evictions: u64,
        entries: Vec<PhaseEntry>,
    ) -> Result<Self, PhaseError> {
        let mut table = Self::with_capacity(threshold, capacity)?;
        if let Some(first) = entries.first() {
            let dims = first.signature.len();
            if let Some(bad) = entries.iter().find(|e| e.signature.len() != dims) {
                return Err(PhaseError::LengthMismatch {
                    expected: dims,
                    found: bad.signature.len(),
                });
            }
        }
        if capacity.is_some_and(|cap| entries.len() > cap) {
            return Err(PhaseError::InvalidConfig("snapshot holds more entries than its capacity"));
        }
        if next_id == 0 {
            return Err(PhaseError::InvalidConfig("next phase id must be at least 1"));
        }
        if entries.iter().any(|e| e.id.0 == 0 || e.id.0 >= next_id) {
            return Err(PhaseError::InvalidConfig("snapshot entry id not below next id"));
        }
        if entries.iter().any(|e| e.last_match > interval) {
            return Err(PhaseError::InvalidConfig("snapshot entry matched after the interval counter"));
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.id == entry.id) {
                return Err(PhaseError::InvalidConfig("duplicate phase id in snapshot"));
            }
        }
        table.entries = entries;
        table.interval = interval;
        table.next_id = next_id;
        table.evictions = evictions;
        Ok(table)
    }

    /// Classify one interval signature.
    ///
    /// Matches the nearest entry when its normalized distance is below the
    /// threshold, otherwise stores `signature` as a new phase.
    pub fn find(&mut self, signature: Signature) -> Result<PhaseMatch, PhaseError> {
        if let Some(first) = self.entries.first() {
            if first.signature.len() != signature.len() {
                return Err(PhaseError::LengthMismatch {
                    expected: first.signature.len(),
                    found: signature.len(),
                });
            }
        }

        self.interval += 1;
        let interval = self.interval;

        let mut nearest: Option<(usize, f64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            let d = normalized_distance(&entry.signature, &signature)?;
            if nearest.map_or(true, |(_, best)| d < best) {
                nearest = Some((idx, d));
            }
        }

        if let Some((idx, d)) = nearest {
            if d < self.threshold {
                let entry = &mut self.entries[idx];
                let reuse = interval - entry.last_match;
                entry.occurrences += 1;
                entry.reuse_distance = reuse;
                entry.last_match = interval;
                tracing::debug!(
                    interval,
                    phase = entry.id.0,
                    distance = d,
                    reuse,
                    occurrences = entry.occurrences,
                    "matched phase"
                );
                return Ok(PhaseMatch {
                    id: entry.id,
                    is_new: false,
                    interval,
                    distance: Some(d),
                    reuse_distance: Some(reuse),
                    evicted: None,
                });
            }
        }

        let Some(following) = self.next_id.checked_add(1) else {
            self.interval -= 1;
            return Err(PhaseError::PhaseIdsExhausted);
        };
        let evicted = match self.capacity {
            Some(cap) if self.entries.len() >= cap => self.evict_least_recent(),
            _ => None,
        };

        let id = PhaseId(self.next_id);
        self.next_id = following;
        self.entries.push(PhaseEntry {
            id,
            signature,
            occurrences: 1,
            last_match: interval,
            reuse_distance: 0,
        });
        tracing::debug!(
            interval,
            phase = id.0,
            nearest = nearest.map(|(_, d)| d),
            table_len = self.entries.len(),
            "created phase"
        );

        Ok(PhaseMatch {
            id,
            is_new: true,
            interval,
            distance: nearest.map(|(_, d)| d),
            reuse_distance: None,
            evicted,
        })
    }

    /// Remove the entry with the oldest `last_match`; earliest in table order
    /// on ties.
    fn evict_least_recent(&mut self) -> Option<PhaseId> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.last_match)
            .map(|(idx, _)| idx)?;
        let entry = self.entries.remove(idx);
        self.evictions += 1;
        tracing::debug!(
            phase = entry.id.0,
            last_match = entry.last_match,
            occurrences = entry.occurrences,
            "evicted phase"
        );
        Some(entry.id)
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    /// Number of stored phases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no phase has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored phases in table order.
    pub fn entries(&self) -> &[PhaseEntry] {
        &self.entries
    }

    /// Look up a stored phase by id.
    pub fn get(&self, id: PhaseId) -> Option<&PhaseEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Match threshold (normalized Manhattan distance).
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Configured capacity, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of intervals classified so far.
    pub fn interval_index(&self) -> u64 {
        self.interval
    }

    /// Id the next new phase will receive.
    pub fn next_id(&self) -> PhaseId {
        PhaseId(self.next_id)
    }

    /// Phases created since construction (including evicted ones).
    pub fn phases_created(&self) -> u32 {
        self.next_id - 1
    }

    /// Entries removed by LRU eviction.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

impl PhaseClassifier for PhaseTable {
    fn classify(&mut self, signature: Signature) -> Result<PhaseMatch, PhaseError> {
        self.find(signature)
    }
}

fn check_threshold(threshold: f64) -> Result<(), PhaseError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(PhaseError::InvalidConfig("phase threshold must lie in [0, 1]"))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
