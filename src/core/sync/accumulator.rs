/*!
 * Shared Accumulator
 *
 * Ordered, lock-guarded collection appended to by concurrent producers.
 *
 * Writers take the exclusive side of a `parking_lot::RwLock`, readers the
 * shared side, so a snapshot never observes a half-applied append and any
 * number of snapshots may run side by side. The lock is never held across
 * an `.await`.
 */

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Thread-safe ordered accumulator
///
/// Cloning is cheap and yields a handle to the same collection.
///
/// # Examples
///
/// ```
/// use probe_race::core::sync::Accumulator;
///
/// let results = Accumulator::new();
/// results.append("data1".to_string());
/// results.append("data2".to_string());
///
/// assert_eq!(results.snapshot(), vec!["data1", "data2"]);
/// ```
pub struct Accumulator<T> {
    entries: Arc<RwLock<Vec<T>>>,
}

impl<T> Accumulator<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Pre-size for a known number of producers
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::with_capacity(capacity))),
        }
    }

    /// Append `entry` at the tail, returning the new length
    ///
    /// Concurrent callers land in lock-arrival order, not call order.
    pub fn append(&self, entry: T) -> usize {
        let mut entries = self.entries.write();
        entries.push(entry);
        entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop all entries, keeping the allocation for the next phase
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<T: Clone> Accumulator<T> {
    /// Copy of the current entries taken under the read lock
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().clone()
    }

    /// Append `entry` and copy the entries as they stand right after it
    ///
    /// Both happen under one write lock, so no other append can slip in
    /// between and the copy always ends with `entry`.
    pub fn append_and_snapshot(&self, entry: T) -> Vec<T> {
        let mut entries = self.entries.write();
        entries.push(entry);
        entries.clone()
    }
}

impl<T> Clone for Accumulator<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Accumulator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("entries", &*self.entries.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_append_preserves_single_writer_order() {
        let acc = Accumulator::new();
        for i in 0..5 {
            assert_eq!(acc.append(i), i + 1);
        }
        assert_eq!(acc.snapshot(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let acc = Accumulator::with_capacity(800);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let acc = acc.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        acc.append(t * 100 + i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut entries = acc.snapshot();
        assert_eq!(entries.len(), 800);
        entries.sort_unstable();
        entries.dedup();
        assert_eq!(entries.len(), 800, "no entry may be duplicated");
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let acc = Accumulator::new();
        acc.append("a");
        acc.append("b");
        assert_eq!(acc.snapshot(), acc.snapshot());
    }

    #[test]
    fn test_clear_resets_for_reuse() {
        let acc = Accumulator::new();
        acc.append(1);
        acc.clear();
        assert!(acc.is_empty());
        acc.append(2);
        assert_eq!(acc.snapshot(), vec![2]);
    }

    #[test]
    fn test_append_and_snapshot_sees_own_entry_last() {
        let acc = Accumulator::with_capacity(64);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let acc = acc.clone();
                thread::spawn(move || {
                    (0..8)
                        .map(|i| {
                            let entry = t * 8 + i;
                            let seen = acc.append_and_snapshot(entry);
                            assert_eq!(seen.last(), Some(&entry));
                            seen.len()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut lengths: Vec<usize> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        lengths.sort_unstable();
        // Every copy reflects a distinct point in the append sequence
        assert_eq!(lengths, (1..=64).collect::<Vec<_>>());
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let acc = Accumulator::new();
        acc.append(1);
        let before = acc.snapshot();
        acc.append(2);
        assert_eq!(before, vec![1]);
        assert_eq!(acc.len(), 2);
    }
}
