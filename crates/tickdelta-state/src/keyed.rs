//! Insertion-ordered record log with a hash index.
//!
//! A [`KeyedLog`] is the storage behind every per-entity and per-cell
//! collection in a [`DeltaState`](crate::delta::DeltaState). Records keep the
//! order in which the serializer should see them, while lookups by key are a
//! single hash lookup instead of a scan over the tick's working set.
//!
//! Removal keeps the records contiguous, so [`remove`](KeyedLog::remove) and
//! [`replace`](KeyedLog::replace) are O(n) in the size of the log: the
//! records after the removed one shift forward and their index entries are
//! rewritten. Lookups, [`push`](KeyedLog::push) and
//! [`get_or_insert_with`](KeyedLog::get_or_insert_with) stay O(1).
//!
//! Two write disciplines are offered:
//!
//! - [`get_or_insert_with`](KeyedLog::get_or_insert_with) finds the record for
//!   a key or appends a new one, then hands out `&mut` for in-place merging.
//! - [`replace`](KeyedLog::replace) removes the record for a key (if any) and
//!   appends the new one at the end, so the final position reflects the last
//!   write.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Keyed
// ---------------------------------------------------------------------------

/// A record that knows its own lookup key.
pub trait Keyed {
    type Key: Copy + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;
}

// ---------------------------------------------------------------------------
// KeyedLog
// ---------------------------------------------------------------------------

/// Records in insertion order, indexed by [`Keyed::key`].
///
/// The index always points at the *first* record pushed for a key. Only
/// [`push`](Self::push) can store a second record under an existing key.
#[derive(Debug, Clone)]
pub struct KeyedLog<V: Keyed> {
    entries: Vec<V>,
    index: HashMap<V::Key, usize>,
}

impl<V: Keyed> KeyedLog<V> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a log from records in order. Duplicate keys are kept; the index
    /// points at the first occurrence.
    pub fn from_vec(entries: Vec<V>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            index.entry(entry.key()).or_insert(pos);
        }
        Self { entries, index }
    }

    /// Number of stored records, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if a record is indexed under `key`.
    pub fn contains(&self, key: V::Key) -> bool {
        self.index.contains_key(&key)
    }

    /// The indexed record for `key`.
    pub fn get(&self, key: V::Key) -> Option<&V> {
        self.index.get(&key).map(|&pos| &self.entries[pos])
    }

    /// Mutable access to the indexed record for `key`.
    pub fn get_mut(&mut self, key: V::Key) -> Option<&mut V> {
        match self.index.get(&key) {
            Some(&pos) => Some(&mut self.entries[pos]),
            None => None,
        }
    }

    /// Append a record unconditionally.
    ///
    /// Returns `false` if a record with the same key already existed. The new
    /// record is stored anyway but is not reachable through the index.
    pub fn push(&mut self, value: V) -> bool {
        let pos = self.entries.len();
        let key = value.key();
        self.entries.push(value);
        match self.index.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(pos);
                true
            }
        }
    }

    /// Find the record for `key`, appending `make()` first if there is none.
    pub fn get_or_insert_with(&mut self, key: V::Key, make: impl FnOnce() -> V) -> &mut V {
        let pos = match self.index.get(&key) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.entries.push(make());
                self.index.insert(key, pos);
                pos
            }
        };
        &mut self.entries[pos]
    }

    /// Remove the indexed record for `value`'s key, then append `value`.
    ///
    /// Returns the record that was displaced, if any.
    pub fn replace(&mut self, value: V) -> Option<V> {
        let key = value.key();
        let displaced = self.remove(key);
        self.push(value);
        displaced
    }

    /// Remove the indexed record for `key`, shifting later records forward.
    ///
    /// O(n): every index entry past the removed position is decremented.
    pub fn remove(&mut self, key: V::Key) -> Option<V> {
        let pos = self.index.remove(&key)?;
        let removed = self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// All records in insertion order.
    pub fn as_slice(&self) -> &[V] {
        &self.entries
    }

    /// Iterate over records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.entries.iter()
    }
}

impl<V: Keyed> Default for KeyedLog<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Keyed + PartialEq> PartialEq for KeyedLog<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<'a, V: Keyed> IntoIterator for &'a KeyedLog<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// The index is derived state: serialize as a plain sequence and rebuild on load.

impl<V: Keyed + Serialize> Serialize for KeyedLog<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, V: Keyed + Deserialize<'de>> Deserialize<'de> for KeyedLog<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<V>::deserialize(deserializer).map(Self::from_vec)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
