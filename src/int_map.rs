use core::fmt::Debug;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::int_table;
use crate::int_table::IntKey;
use crate::int_table::IntTable;

/// A map keyed by primitive integers.
///
/// Keys are stored unboxed and hash to their own bit pattern, so no hasher
/// is involved. Every integer value, including `0` and the extremes of the
/// type, is a valid key.
///
/// # Examples
///
/// ```rust
/// # use probe_hash::IntMap;
/// #
/// let mut ids = IntMap::new();
/// ids.insert(-1i32, "sentinel");
/// ids.insert(0, "zero");
///
/// assert_eq!(ids.get(-1), Some(&"sentinel"));
/// assert_eq!(ids.insert_if_absent(0, "other"), Some(&"zero"));
/// assert!(ids.remove_if(0, &"zero"));
/// assert_eq!(ids.len(), 1);
/// ```
pub struct IntMap<K: IntKey, V> {
    table: IntTable<K, V>,
}

impl<K: IntKey, V: Clone> Clone for IntMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K: IntKey + Debug, V: Debug> Debug for IntMap<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: IntKey, V: PartialEq> PartialEq for IntMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|other_v| v == other_v))
    }
}

impl<K: IntKey, V: Eq> Eq for IntMap<K, V> {}

impl<K: IntKey, V> Default for IntMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IntKey, V> IntMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            table: IntTable::new(),
        }
    }

    /// Creates a map that holds at least `capacity` entries without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: IntTable::with_capacity(capacity),
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
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

    /// Inserts a key-value pair, returning the previous value for the key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.table.insert(key, value)
    }

    /// Inserts `value` only if `key` is absent.
    ///
    /// Returns the value already stored for `key`, leaving it unchanged, or
    /// `None` if the new pair was inserted.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        match self.table.entry(key) {
            int_table::Entry::Occupied(entry) => Some(&*entry.into_mut()),
            int_table::Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get(&self, key: K) -> Option<&V> {
        self.table.get(key)
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.table.get_mut(key)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: K) -> bool {
        self.table.contains_key(key)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: K) -> Option<V> {
        self.table.remove(key)
    }

    /// Removes `key` only if it is currently mapped to `value`.
    pub fn remove_if(&mut self, key: K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.table.remove_when(key, |current| current == value).is_some()
    }

    /// Gets the entry for `key` for in-place manipulation.
    pub fn entry(&mut self, key: K) -> int_table::Entry<'_, K, V> {
        self.table.entry(key)
    }

    /// Removes all entries, keeping the capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rebuilds the map in place, purging tombstones.
    pub fn rehash(&mut self) {
        self.table.rehash();
    }

    /// Reserves capacity for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Shrinks the capacity of the map as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Returns an iterator over `(key, &value)` pairs.
    pub fn iter(&self) -> int_table::Iter<'_, K, V> {
        self.table.iter()
    }

    /// Returns an iterator over `(key, &mut value)` pairs.
    pub fn iter_mut(&mut self) -> int_table::IterMut<'_, K, V> {
        self.table.iter_mut()
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over mutable references to the values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Clears the map, returning all pairs as an iterator.
    pub fn drain(&mut self) -> int_table::Drain<'_, K, V> {
        self.table.drain()
    }

    /// Returns a cursor that can remove the entry it last yielded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::IntMap;
    /// #
    /// let mut map: IntMap<u64, u64> = (0..100).map(|k| (k, k % 7)).collect();
    ///
    /// let mut cursor = map.cursor();
    /// while let Some((_, value)) = cursor.next() {
    ///     if *value == 0 {
    ///         cursor.remove();
    ///     }
    /// }
    /// assert_eq!(map.len(), 85);
    /// ```
    pub fn cursor(&mut self) -> int_table::Cursor<'_, K, V> {
        self.table.cursor()
    }

    /// Retains only the pairs for which `f` returns `true`.
    pub fn retain(&mut self, f: impl FnMut(K, &mut V) -> bool) {
        self.table.retain(f);
    }

    /// Creates an iterator that removes and yields the pairs for which `f`
    /// returns `true`.
    pub fn extract_if<F>(&mut self, f: F) -> int_table::ExtractIf<'_, K, V, F>
    where
        F: FnMut(K, &mut V) -> bool,
    {
        self.table.extract_if(f)
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        self.table.debug_stats()
    }

    /// Computes a histogram of probe lengths for the current map state.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::stats::ProbeHistogram {
        self.table.probe_histogram()
    }
}

impl<K: IntKey, V> Index<K> for IntMap<K, V> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not present in IntMap"),
        }
    }
}

impl<K: IntKey, V> FromIterator<(K, V)> for IntMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            table: IntTable::from_iter(iter),
        }
    }
}

impl<K: IntKey, V> Extend<(K, V)> for IntMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<K: IntKey, V> IntoIterator for IntMap<K, V> {
    type IntoIter = int_table::IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

impl<'a, K: IntKey, V> IntoIterator for &'a IntMap<K, V> {
    type IntoIter = int_table::Iter<'a, K, V>;
    type Item = (K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K: IntKey, V> IntoIterator for &'a mut IntMap<K, V> {
    type IntoIter = int_table::IterMut<'a, K, V>;
    type Item = (K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// An iterator over the keys of an `IntMap`.
pub struct Keys<'a, K, V> {
    inner: int_table::Iter<'a, K, V>,
}

impl<K: Copy, V> Iterator for Keys<'_, K, V> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Copy, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K: Copy, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of an `IntMap`.
pub struct Values<'a, K, V> {
    inner: int_table::Iter<'a, K, V>,
}

impl<'a, K: Copy, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Copy, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K: Copy, V> FusedIterator for Values<'_, K, V> {}

/// An iterator over mutable references to the values of an `IntMap`.
pub struct ValuesMut<'a, K, V> {
    inner: int_table::IterMut<'a, K, V>,
}

impl<'a, K: Copy, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Copy, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K: Copy, V> FusedIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_insert_get_overwrite() {
        let mut map = IntMap::new();
        assert_eq!(map.insert(1u32, "a"), None);
        assert_eq!(map.insert(1, "b"), Some("a"));
        assert_eq!(map.get(1), Some(&"b"));
        assert_eq!(map[1], "b");
        assert_eq!(map.get(2), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_zero_and_extreme_keys() {
        let mut map = IntMap::new();
        map.insert(0i64, 'z');
        map.insert(i64::MIN, 'n');
        map.insert(i64::MAX, 'x');
        map.insert(-1, 'm');

        assert_eq!(map.len(), 4);
        assert_eq!(map[0], 'z');
        assert_eq!(map[i64::MIN], 'n');
        assert_eq!(map[i64::MAX], 'x');
        assert_eq!(map[-1], 'm');
    }

    #[test]
    fn test_insert_if_absent() {
        let mut map = IntMap::new();
        assert_eq!(map.insert_if_absent(3u8, "a"), None);
        assert_eq!(map.insert_if_absent(3, "b"), Some(&"a"));
        assert_eq!(map.get(3), Some(&"a"));
    }

    #[test]
    fn test_remove_and_remove_if() {
        let mut map: IntMap<u16, String> = IntMap::new();
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());

        assert!(!map.remove_if(1, &"uno".to_string()));
        assert!(map.remove_if(1, &"one".to_string()));
        assert!(!map.contains_key(1));
        assert_eq!(map.remove(1), None);
        assert_eq!(map.remove(2), Some("two".to_string()));
        assert!(map.is_empty());
    }

    #[test]
    fn test_growth_scenario() {
        let mut map = IntMap::new();
        for k in 1..=20u32 {
            map.insert(k, k * 3);
            match k {
                1..=8 => assert_eq!(map.capacity(), 16),
                9..=16 => assert_eq!(map.capacity(), 32),
                _ => assert_eq!(map.capacity(), 64),
            }
        }
        for k in 1..=20u32 {
            assert_eq!(map.get(k), Some(&(k * 3)));
        }
    }

    #[test]
    fn test_overwrite_does_not_resize() {
        let mut map: IntMap<u64, u64> = IntMap::new();
        for k in 0..8 {
            map.insert(k, k);
        }
        assert_eq!(map.insert(3, 99), Some(3));
        assert_eq!(map.insert_if_absent(4, 0), Some(&4));
        map.entry(5).and_modify(|v| *v = 50);

        assert_eq!(map.capacity(), 16);
        assert_eq!(map.tombstones(), 0);
        assert_eq!(map[5], 50);

        map.insert(8, 8);
        assert_eq!(map.capacity(), 32);
    }

    #[test]
    fn test_tombstone_purge_scenario() {
        let mut map = IntMap::new();
        for k in 0..12u64 {
            map.insert(k, k);
        }
        for k in 0..7u64 {
            assert_eq!(map.remove(k), Some(k));
        }
        assert_eq!(map.tombstones(), 7);
        assert_eq!(map.remove(7), Some(7));
        assert_eq!(map.tombstones(), 0);
        for k in 8..12u64 {
            assert_eq!(map[k], k);
        }
    }

    #[test]
    fn test_entry() {
        let mut counts: IntMap<u8, usize> = IntMap::new();
        for b in b"mississippi" {
            *counts.entry(*b).or_insert(0) += 1;
        }
        assert_eq!(counts[b's'], 4);
        assert_eq!(counts[b'p'], 2);
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn test_iterators() {
        let mut map: IntMap<i32, i32> = (-10..10).map(|k| (k, k * k)).collect();
        let mut keys: Vec<i32> = map.keys().collect();
        keys.sort();
        assert_eq!(keys, (-10..10).collect::<Vec<_>>());
        assert_eq!(map.values().sum::<i32>(), (-10..10).map(|k| k * k).sum());

        for v in map.values_mut() {
            *v = -*v;
        }
        for (k, v) in &mut map {
            *v -= k;
        }
        assert_eq!(map[3], -9 - 3);

        let mut owned: Vec<_> = map.clone().into_iter().collect();
        owned.sort();
        assert_eq!(owned.len(), 20);
        assert_eq!(owned[0], (-10, -100 + 10));
    }

    #[test]
    fn test_cursor_keeps_capacity() {
        let mut map: IntMap<u32, u32> = (0..8).map(|k| (k, k)).collect();
        let capacity = map.capacity();
        let mut cursor = map.cursor();
        while let Some((k, _)) = cursor.next() {
            if k < 6 {
                cursor.remove();
            }
        }
        assert_eq!(map.capacity(), capacity);
        assert_eq!(map.tombstones(), 6);
        assert_eq!(map.len(), 2);

        map.insert(100, 100);
        assert!(map.contains_key(100));
        assert!(map.contains_key(7));
    }

    #[test]
    fn test_equality_and_debug() {
        let a: IntMap<u8, u8> = [(1, 1), (2, 2)].into_iter().collect();
        let mut b = IntMap::new();
        b.extend([(2u8, 2u8), (1, 1)]);
        assert_eq!(a, b);
        b.insert(1, 9);
        assert_ne!(a, b);

        let single: IntMap<u8, u8> = [(4, 5)].into_iter().collect();
        assert_eq!(alloc::format!("{single:?}"), "{4: 5}");
    }

    #[test]
    #[should_panic(expected = "key not present")]
    fn test_index_missing_panics() {
        let map: IntMap<u8, u8> = IntMap::new();
        let _ = map[0];
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i16, u8),
        InsertIfAbsent(i16, u8),
        Remove(i16),
        RemoveIf(i16, u8),
        Retain(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (-64i16..64, 0u8..4).prop_map(|(k, v)| Op::Insert(k, v)),
            2 => (-64i16..64, 0u8..4).prop_map(|(k, v)| Op::InsertIfAbsent(k, v)),
            4 => (-64i16..64).prop_map(Op::Remove),
            2 => (-64i16..64, 0u8..4).prop_map(|(k, v)| Op::RemoveIf(k, v)),
            1 => (0u8..4).prop_map(Op::Retain),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_hashbrown(ops in proptest::collection::vec(op_strategy(), 0..512)) {
            let mut map = IntMap::new();
            let mut model = hashbrown::HashMap::new();

            for op in ops {
                match op {
                    Op::Insert(k, v) => {
                        prop_assert_eq!(map.insert(k, v), model.insert(k, v));
                    }
                    Op::InsertIfAbsent(k, v) => {
                        let expected = model.get(&k).copied();
                        model.entry(k).or_insert(v);
                        prop_assert_eq!(map.insert_if_absent(k, v).copied(), expected);
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(map.remove(k), model.remove(&k));
                    }
                    Op::RemoveIf(k, v) => {
                        let expected = model.get(&k) == Some(&v);
                        if expected {
                            model.remove(&k);
                        }
                        prop_assert_eq!(map.remove_if(k, &v), expected);
                    }
                    Op::Retain(v) => {
                        map.retain(|_, value| *value != v);
                        model.retain(|_, value| *value != v);
                    }
                }
                prop_assert_eq!(map.len(), model.len());
                prop_assert!(map.len() + map.tombstones() < map.capacity());
            }

            for k in -64i16..64 {
                prop_assert_eq!(map.get(k), model.get(&k));
            }
        }
    }
}
