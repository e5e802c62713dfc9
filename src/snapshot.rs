//! Portable snapshot of a [`PhaseTable`] for persistence between runs.
//!
//! A snapshot captures everything `find` depends on: threshold, capacity,
//! interval counter, next id and every entry in table order. Restoring it
//! yields a table that classifies the next interval exactly as the original
//! would have, so phase ids stay stable across runs that share a snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use bbv_phase::snapshot::PhaseTableSnapshot;
//!
//! let snapshot = PhaseTableSnapshot::from_table(&table);
//! let json = serde_json::to_string(&snapshot).unwrap();
//! let restored: PhaseTableSnapshot = serde_json::from_str(&json).unwrap();
//! let table = restored.restore()?;
//! ```
//!
//! Requires the `serde` feature.

use alloc::vec::Vec;

use crate::error::PhaseError;
use crate::phase::{PhaseEntry, PhaseId, PhaseTable};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Serializable state of a [`PhaseTable`].
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct PhaseTableSnapshot {
    /// Format version, [`SNAPSHOT_VERSION`] for newly captured snapshots.
    pub version: u16,
    /// Match threshold.
    pub threshold: f64,
    /// LRU capacity, `None` when unbounded.
    pub capacity: Option<usize>,
    /// Intervals classified when the snapshot was taken.
    pub interval: u64,
    /// Id the next new phase receives.
    pub next_id: u32,
    /// Entries evicted before the snapshot was taken.
    pub evictions: u64,
    /// Stored phases in table order.
    pub entries: Vec<PhaseEntry>,
}

impl PhaseTableSnapshot {
    /// Capture the current state of `table`.
    pub fn from_table(table: &PhaseTable) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            threshold: table.threshold(),
            capacity: table.capacity(),
            interval: table.interval_index(),
            next_id: table.next_id().0,
            evictions: table.evictions(),
            entries: table.entries().to_vec(),
        }
    }

    /// Rebuild a table from this snapshot.
    ///
    /// Rejects snapshots from a newer format, with inconsistent signature
    /// lengths, more entries than the capacity, or ids at or above `next_id`.
    pub fn restore(&self) -> Result<PhaseTable, PhaseError> {
        if self.version > SNAPSHOT_VERSION {
            return Err(PhaseError::InvalidConfig("unsupported snapshot version"));
        }
        PhaseTable::from_parts(
            self.threshold,
            self.capacity,
            self.interval,
            self.next_id,
            self.evictions,
            self.entries.clone(),
        )
    }

    /// Number of stored phases.
    pub fn phase_count(&self) -> usize {
        self.entries.len()
    }

    /// Look up one phase by id.
    pub fn find_phase(&self, id: PhaseId) -> Option<&PhaseEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}
