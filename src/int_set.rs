use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::int_table;
use crate::int_table::IntKey;
use crate::int_table::IntTable;

/// A set of primitive integers.
///
/// # Examples
///
/// ```rust
/// # use probe_hash::IntSet;
/// #
/// let mut seen = IntSet::new();
/// assert!(seen.insert(5u32));
/// assert!(!seen.insert(5));
/// assert!(seen.remove(5));
/// assert!(seen.insert(5));
/// assert_eq!(seen.len(), 1);
/// ```
#[derive(Clone)]
pub struct IntSet<K: IntKey> {
    table: IntTable<K, ()>,
}

impl<K: IntKey + Debug> Debug for IntSet<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: IntKey> PartialEq for IntSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|k| other.contains(k))
    }
}

impl<K: IntKey> Eq for IntSet<K> {}

impl<K: IntKey> Default for IntSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IntKey> IntSet<K> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            table: IntTable::new(),
        }
    }

    /// Creates a set that holds at least `capacity` keys without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: IntTable::with_capacity(capacity),
        }
    }

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of tombstones left behind by removals.
    pub fn tombstones(&self) -> usize {
        self.table.tombstones()
    }

    /// Adds a key. Returns `true` if it was not already present.
    pub fn insert(&mut self, key: K) -> bool {
        match self.table.entry(key) {
            int_table::Entry::Occupied(_) => false,
            int_table::Entry::Vacant(entry) => {
                entry.insert(());
                true
            }
        }
    }

    /// Removes a key. Returns `true` if it was present.
    pub fn remove(&mut self, key: K) -> bool {
        self.table.remove(key).is_some()
    }

    /// Returns `true` if the set contains `key`.
    pub fn contains(&self, key: K) -> bool {
        self.table.contains_key(key)
    }

    /// Removes all keys, keeping the capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rebuilds the set in place, purging tombstones.
    pub fn rehash(&mut self) {
        self.table.rehash();
    }

    /// Reserves capacity for at least `additional` more keys.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Returns an iterator over the keys in slot order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all keys as an iterator.
    pub fn drain(&mut self) -> Drain<'_, K> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Returns a cursor that can remove the key it last yielded.
    pub fn cursor(&mut self) -> Cursor<'_, K> {
        Cursor {
            inner: self.table.cursor(),
        }
    }

    /// Retains only the keys for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(K) -> bool) {
        self.table.retain(|k, _| f(k));
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        self.table.debug_stats()
    }

    /// Computes a histogram of probe lengths for the current set state.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::stats::ProbeHistogram {
        self.table.probe_histogram()
    }
}

impl<K: IntKey> FromIterator<K> for IntSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K: IntKey> Extend<K> for IntSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.table.extend(iter.into_iter().map(|k| (k, ())));
    }
}

impl<K: IntKey> IntoIterator for IntSet<K> {
    type IntoIter = IntoIter<K>;
    type Item = K;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K: IntKey> IntoIterator for &'a IntSet<K> {
    type IntoIter = Iter<'a, K>;
    type Item = K;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the keys of an `IntSet`.
pub struct Iter<'a, K> {
    inner: int_table::Iter<'a, K, ()>,
}

impl<K: Copy> Iterator for Iter<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Copy> ExactSizeIterator for Iter<'_, K> {}
impl<K: Copy> FusedIterator for Iter<'_, K> {}

/// An owning iterator over the keys of an `IntSet`.
pub struct IntoIter<K: IntKey> {
    inner: int_table::IntoIter<K, ()>,
}

impl<K: IntKey> Iterator for IntoIter<K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: IntKey> ExactSizeIterator for IntoIter<K> {}

/// A draining iterator over the keys of an `IntSet`.
pub struct Drain<'a, K: IntKey> {
    inner: int_table::Drain<'a, K, ()>,
}

impl<K: IntKey> Iterator for Drain<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: IntKey> ExactSizeIterator for Drain<'_, K> {}

/// A cursor over an `IntSet` that can remove the key it last yielded.
pub struct Cursor<'a, K: IntKey> {
    inner: int_table::Cursor<'a, K, ()>,
}

impl<K: IntKey> Cursor<'_, K> {
    /// Advances to the next key.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    /// Removes the key last returned by [`next`](Self::next). Returns `true`
    /// if a key was removed.
    pub fn remove(&mut self) -> bool {
        self.inner.remove().is_some()
    }
}
