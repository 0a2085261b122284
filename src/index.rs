//! Ordered key lookups over a catalog snapshot
//!
//! A `SortedIndex` is an immutable array of `(key, original_position)`
//! pairs built once from a snapshot of the store. It never reorders the
//! store itself, and it does not survive structural changes: any insert or
//! remove on the store invalidates outstanding indexes, which must be
//! rebuilt before the next query.

use crate::entry::Entry;

#[derive(Debug, Clone)]
struct Slot<K> {
    key: K,
    position: usize,
}

/// Immutable `(key, position)` array, ascending by key.
///
/// The sort is stable, so entries sharing a key keep their original store
/// order; bucket scans therefore enumerate candidates in ascending
/// original-index order, which is the documented tie-break for tiered
/// matching.
#[derive(Debug, Clone)]
pub struct SortedIndex<K> {
    slots: Vec<Slot<K>>,
}

impl<K: Ord> SortedIndex<K> {
    /// Build an index over a store snapshot. O(n log n).
    pub fn build(entries: &[Entry], selector: impl Fn(&Entry) -> K) -> Self {
        let mut slots: Vec<Slot<K>> = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| Slot {
                key: selector(entry),
                position,
            })
            .collect();
        slots.sort_by(|a, b| a.key.cmp(&b.key));
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the first slot with `key' >= key`. O(log n).
    pub fn lower_bound(&self, key: &K) -> usize {
        self.slots.partition_point(|slot| slot.key < *key)
    }

    /// Store positions of every entry whose key equals `key`, in ascending
    /// original-index order. An absent key yields an empty iterator without
    /// inspecting any slot outside the bucket.
    pub fn bucket<'a>(&'a self, key: &'a K) -> impl Iterator<Item = usize> + 'a {
        self.slots[self.lower_bound(key)..]
            .iter()
            .take_while(move |slot| slot.key == *key)
            .map(|slot| slot.position)
    }
}

/// Index keyed on `current_size`
pub fn by_current_size(entries: &[Entry]) -> SortedIndex<u64> {
    SortedIndex::build(entries, |e| e.current_size)
}

/// Index keyed on `original_size`
pub fn by_original_size(entries: &[Entry]) -> SortedIndex<u64> {
    SortedIndex::build(entries, |e| e.original_size)
}

/// Index keyed on file name
pub fn by_name(entries: &[Entry]) -> SortedIndex<String> {
    SortedIndex::build(entries, |e| e.name.clone())
}
