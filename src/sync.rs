//! Phase table shared between instruction streams.
//!
//! Each traced thread keeps its own [`IntervalAccumulator`]; they may classify
//! against one table as long as `find` is serialized. [`SharedPhaseTable`]
//! does that with a `parking_lot` mutex held for exactly one `find`.
//!
//! [`IntervalAccumulator`]: crate::accumulator::IntervalAccumulator

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::PhaseError;
use crate::phase::{PhaseClassifier, PhaseMatch, PhaseTable};
use crate::signature::Signature;

/// Cloneable handle to a lock-guarded [`PhaseTable`].
#[derive(Clone, Debug)]
pub struct SharedPhaseTable {
    inner: Arc<Mutex<PhaseTable>>,
}

impl SharedPhaseTable {
    /// Share `table` between streams.
    pub fn new(table: PhaseTable) -> Self {
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    /// Classify under the lock.
    pub fn find(&self, signature: Signature) -> Result<PhaseMatch, PhaseError> {
        self.inner.lock().find(signature)
    }

    /// Run `f` against the table while holding the lock.
    pub fn with_table<R>(&self, f: impl FnOnce(&PhaseTable) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Number of stored phases.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// `true` when no phase has been stored.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl PhaseClassifier for SharedPhaseTable {
    fn classify(&mut self, signature: Signature) -> Result<PhaseMatch, PhaseError> {
        self.find(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn test_handles_see_one_table() {
        let shared = SharedPhaseTable::new(PhaseTable::new(0.3).unwrap());
        let mut a = shared.clone();
        let mut b = shared.clone();
        let first = a.classify(Signature::new(std::vec![30, 30])).unwrap();
        let second = b.classify(Signature::new(std::vec![30, 30])).unwrap();
        assert!(first.is_new);
        assert_eq!(second.id, first.id);
        assert!(!second.is_new);
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_concurrent_find_is_serialized() {
        let shared = SharedPhaseTable::new(PhaseTable::new(0.3).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let table = shared.clone();
                thread::spawn(move || {
                    for i in 0..50i64 {
                        let e = if (i + t) % 2 == 0 { [40, 0] } else { [0, 40] };
                        table.find(Signature::new(e.to_vec())).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        shared.with_table(|t| {
            assert_eq!(t.len(), 2);
            assert_eq!(t.interval_index(), 200);
            let total: u64 = t.entries().iter().map(|e| e.occurrences).sum();
            assert_eq!(total, 200);
        });
    }
}
