//! An open-addressing table keyed by primitive integers.
//!
//! [`IntTable`] stores keys unboxed in their own array, with slot state in a
//! parallel array and values in possibly-uninitialized storage. It backs
//! [`IntMap`](crate::IntMap) and [`IntSet`](crate::IntSet).
//!
//! Every value slot is initialized exactly when its state is
//! [`SlotState::Occupied`]. The unsafe blocks in this module rely on that
//! invariant and nothing else.

use alloc::boxed::Box;
use alloc::vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::mem::MaybeUninit;

use crate::probe;
use crate::probe::Probe;
use crate::probe::Resize;
use crate::probe::SlotState;

/// A primitive integer usable as an [`IntTable`] key.
///
/// The hash of a key is its bit pattern widened to 64 bits, sign-extending
/// signed types. Dense key ranges therefore land in distinct home slots, while
/// the probe step is still mixed from every bit of the key.
pub trait IntKey: Copy + Eq + Default {
    /// The key's bits as a 64-bit hash.
    fn hash_bits(self) -> u64;
}

macro_rules! impl_int_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntKey for $t {
                #[inline(always)]
                fn hash_bits(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_int_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// An integer-keyed hash table using open addressing with double hashing.
///
/// # Example
///
/// ```rust
/// # use probe_hash::int_table::IntTable;
/// #
/// let mut table = IntTable::new();
/// table.insert(7u32, "seven");
/// table.insert(11, "eleven");
///
/// assert_eq!(table.get(7), Some(&"seven"));
/// assert_eq!(table.remove(11), Some("eleven"));
/// assert!(!table.contains_key(11));
/// ```
pub struct IntTable<K: IntKey, V> {
    states: Box<[SlotState]>,
    keys: Box<[K]>,
    values: Box<[MaybeUninit<V>]>,
    populated: usize,
    tombstones: usize,
}

impl<K: IntKey, V> Drop for IntTable<K, V> {
    fn drop(&mut self) {
        if !core::mem::needs_drop::<V>() || self.populated == 0 {
            return;
        }

        for (state, value) in self.states.iter().zip(self.values.iter_mut()) {
            if *state == SlotState::Occupied {
                // SAFETY: occupied slots hold initialized values.
                unsafe { value.assume_init_drop() };
            }
        }
    }
}

impl<K: IntKey, V: Clone> Clone for IntTable<K, V> {
    fn clone(&self) -> Self {
        let mut cloned = Self::with_slots(self.capacity());
        cloned.keys.copy_from_slice(&self.keys);
        for (index, state) in self.states.iter().enumerate() {
            match state {
                SlotState::Occupied => {
                    // SAFETY: occupied slots hold initialized values.
                    let value = unsafe { self.values[index].assume_init_ref() };
                    cloned.values[index].write(value.clone());
                    cloned.states[index] = SlotState::Occupied;
                    cloned.populated += 1;
                }
                SlotState::Tombstone => {
                    cloned.states[index] = SlotState::Tombstone;
                    cloned.tombstones += 1;
                }
                SlotState::Empty => {}
            }
        }
        cloned
    }
}

impl<K: IntKey, V> Debug for IntTable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        let strip: String = self
            .states
            .iter()
            .map(|state| match state {
                SlotState::Empty => '.',
                SlotState::Tombstone => 'x',
                SlotState::Occupied => '#',
            })
            .collect();

        f.debug_struct("IntTable")
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.capacity())
            .field("slots", &strip)
            .finish()
    }
}

impl<K: IntKey, V> Default for IntTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IntKey, V> IntTable<K, V> {
    /// Creates an empty table with the initial capacity of 16 slots.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a table that can hold at least `capacity` entries without
    /// growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_slots(probe::capacity_for(capacity))
    }

    fn with_slots(slots: usize) -> Self {
        debug_assert!(slots.is_power_of_two());
        Self {
            states: vec![SlotState::Empty; slots].into_boxed_slice(),
            keys: vec![K::default(); slots].into_boxed_slice(),
            values: Box::new_uninit_slice(slots),
            populated: 0,
            tombstones: 0,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.states.len() - 1
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots in the table. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// Returns the number of tombstones currently in the table.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    #[inline]
    fn find_index(&self, key: K) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        let states = &self.states;
        let keys = &self.keys;
        probe::find(key.hash_bits(), self.mask(), |i| states[i], |i| keys[i] == key)
    }

    /// Returns a reference to the value stored for `key`.
    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        let index = self.find_index(key)?;
        // SAFETY: `find_index` only returns occupied slots.
        Some(unsafe { self.values[index].assume_init_ref() })
    }

    /// Returns a mutable reference to the value stored for `key`.
    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let index = self.find_index(key)?;
        // SAFETY: `find_index` only returns occupied slots.
        Some(unsafe { self.values[index].assume_init_mut() })
    }

    /// Returns `true` if the table holds an entry for `key`.
    #[inline]
    pub fn contains_key(&self, key: K) -> bool {
        self.find_index(key).is_some()
    }

    /// Inserts a value, returning the value previously stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::int_table::IntTable;
    /// #
    /// let mut table = IntTable::new();
    /// assert_eq!(table.insert(-3i64, 1), None);
    /// assert_eq!(table.insert(-3, 2), Some(1));
    /// assert_eq!(table.get(-3), Some(&2));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entry(key) {
            Entry::Occupied(mut entry) => Some(entry.insert(value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Gets the entry for `key`. When the key is absent and an insertion would
    /// cross a threshold, the table grows or compacts first.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let mut probe = self.probe_for_insert(key);
        if matches!(probe, Probe::Vacant { .. }) && self.maybe_resize_rehash() {
            probe = self.probe_for_insert(key);
        }

        match probe {
            Probe::Occupied(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Probe::Vacant { index, tombstone } => Entry::Vacant(VacantEntry {
                table: self,
                index,
                key,
                tombstone,
            }),
        }
    }

    /// Removes the entry for `key`, returning its value.
    pub fn remove(&mut self, key: K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry for `key`, returning the stored key and value.
    pub fn remove_entry(&mut self, key: K) -> Option<(K, V)> {
        let index = self.find_index(key)?;
        let entry = self.remove_at(index);
        self.maybe_purge_tombstones();
        Some(entry)
    }

    /// Like [`remove`](Self::remove), but only when `pred` accepts the current
    /// value.
    pub fn remove_when(&mut self, key: K, pred: impl FnOnce(&V) -> bool) -> Option<V> {
        let index = self.find_index(key)?;
        // SAFETY: `find_index` only returns occupied slots.
        if !pred(unsafe { self.values[index].assume_init_ref() }) {
            return None;
        }
        let (_, value) = self.remove_at(index);
        self.maybe_purge_tombstones();
        Some(value)
    }

    fn remove_at(&mut self, index: usize) -> (K, V) {
        debug_assert_eq!(self.states[index], SlotState::Occupied);
        self.states[index] = SlotState::Tombstone;
        self.populated -= 1;
        self.tombstones += 1;
        // SAFETY: the slot was occupied until the line above and its state
        // now marks the value as moved out.
        let value = unsafe { self.values[index].assume_init_read() };
        (self.keys[index], value)
    }

    /// Removes all entries, keeping the capacity.
    pub fn clear(&mut self) {
        self.populated = 0;
        self.tombstones = 0;
        for (state, value) in self.states.iter_mut().zip(self.values.iter_mut()) {
            let was = core::mem::replace(state, SlotState::Empty);
            if was == SlotState::Occupied {
                // SAFETY: the slot was occupied; its state is already reset so
                // a panicking destructor cannot cause a double drop.
                unsafe { value.assume_init_drop() };
            }
        }
    }

    /// Rebuilds the table at its current capacity, purging all tombstones.
    pub fn rehash(&mut self) {
        self.resize(self.capacity());
    }

    /// Reserves capacity for at least `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        let required = probe::capacity_for(self.populated.saturating_add(additional));
        if required > self.capacity() {
            self.resize(required);
        }
    }

    /// Shrinks the table to the smallest capacity that holds its entries,
    /// purging tombstones.
    pub fn shrink_to_fit(&mut self) {
        let required = probe::capacity_for(self.populated);
        if required < self.capacity() || self.tombstones > 0 {
            self.resize(required);
        }
    }

    #[inline]
    fn probe_for_insert(&self, key: K) -> Probe {
        let states = &self.states;
        let keys = &self.keys;
        probe::find_or_vacant(
            key.hash_bits(),
            self.mask(),
            |i| states[i],
            |i| keys[i] == key,
        )
    }

    #[inline]
    fn maybe_resize_rehash(&mut self) -> bool {
        match probe::before_insert(self.populated, self.tombstones, self.capacity()) {
            Resize::None => false,
            Resize::Grow(capacity) => {
                self.resize(capacity);
                true
            }
            Resize::Rehash => {
                self.rehash();
                true
            }
        }
    }

    #[inline]
    fn maybe_purge_tombstones(&mut self) {
        if probe::should_purge(self.tombstones, self.capacity()) {
            self.rehash();
        }
    }

    #[cold]
    #[inline(never)]
    fn resize(&mut self, capacity: usize) {
        debug_assert!(self.populated < capacity);

        let mut fresh = Self::with_slots(capacity);
        let mask = fresh.mask();
        for index in 0..self.states.len() {
            if self.states[index] != SlotState::Occupied {
                continue;
            }
            let key = self.keys[index];
            let states = &fresh.states;
            let target = probe::find_empty(key.hash_bits(), mask, |i| states[i]);

            self.states[index] = SlotState::Empty;
            // SAFETY: the slot was occupied and is now marked empty, so the
            // value is moved exactly once.
            let value = unsafe { self.values[index].assume_init_read() };
            fresh.keys[target] = key;
            fresh.values[target].write(value);
            fresh.states[target] = SlotState::Occupied;
            fresh.populated += 1;
        }

        debug_assert_eq!(fresh.populated, self.populated);
        self.populated = 0;
        *self = fresh;
    }

    /// Returns an iterator over `(key, &value)` pairs in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            states: self.states.iter(),
            keys: self.keys.iter(),
            values: self.values.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over `(key, &mut value)` pairs in slot order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            states: self.states.iter(),
            keys: self.keys.iter(),
            values: self.values.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Removes every entry, returning them as an iterator. The table keeps its
    /// capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::int_table::IntTable;
    /// #
    /// let mut table = IntTable::new();
    /// table.insert(1u8, 'a');
    /// table.insert(2, 'b');
    ///
    /// let mut drained: Vec<_> = table.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [(1, 'a'), (2, 'b')]);
    /// assert!(table.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        let capacity = self.capacity();
        let old = core::mem::replace(self, Self::with_slots(capacity));
        Drain {
            inner: old.into_iter(),
            _table: core::marker::PhantomData,
        }
    }

    /// Returns a cursor that can remove the entry it last yielded.
    ///
    /// Removal through the cursor never resizes or rehashes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::int_table::IntTable;
    /// #
    /// let mut table: IntTable<u32, u32> = (0..10).map(|k| (k, k * k)).collect();
    ///
    /// let mut cursor = table.cursor();
    /// while let Some((key, _)) = cursor.next() {
    ///     if key >= 5 {
    ///         cursor.remove();
    ///     }
    /// }
    /// assert_eq!(table.len(), 5);
    /// assert_eq!(table.tombstones(), 5);
    /// ```
    pub fn cursor(&mut self) -> Cursor<'_, K, V> {
        let remaining = self.populated;
        Cursor {
            table: self,
            index: 0,
            remaining,
            current: None,
        }
    }

    /// Retains only the entries for which `f` returns `true`, purging
    /// tombstones afterwards if needed.
    pub fn retain(&mut self, mut f: impl FnMut(K, &mut V) -> bool) {
        let mut cursor = self.cursor();
        while let Some((key, value)) = cursor.next() {
            if !f(key, value) {
                cursor.remove();
            }
        }
        self.maybe_purge_tombstones();
    }

    /// Creates an iterator that removes and yields the entries for which `f`
    /// returns `true`.
    pub fn extract_if<F>(&mut self, f: F) -> ExtractIf<'_, K, V, F>
    where
        F: FnMut(K, &mut V) -> bool,
    {
        ExtractIf {
            cursor: self.cursor(),
            pred: f,
        }
    }

    #[cfg(any(test, feature = "stats"))]
    fn collect_stats(&self) -> (crate::stats::DebugStats, crate::stats::ProbeHistogram) {
        let occupied = self
            .states
            .iter()
            .zip(self.keys.iter())
            .enumerate()
            .filter(|(_, (state, _))| **state == SlotState::Occupied)
            .map(|(index, (_, key))| (index, key.hash_bits()));

        crate::stats::collect(
            self.mask(),
            self.populated,
            self.tombstones,
            core::mem::size_of_val::<[SlotState]>(&self.states)
                + core::mem::size_of_val::<[K]>(&self.keys)
                + core::mem::size_of_val::<[MaybeUninit<V>]>(&self.values),
            occupied,
        )
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        self.collect_stats().0
    }

    /// Computes a histogram of probe lengths for the current table state.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::stats::ProbeHistogram {
        self.collect_stats().1
    }
}

impl<K: IntKey, V> FromIterator<(K, V)> for IntTable<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<K: IntKey, V> Extend<(K, V)> for IntTable<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// A view into a single entry of an [`IntTable`].
pub enum Entry<'a, K: IntKey, V> {
    /// No value is stored for the key.
    Vacant(VacantEntry<'a, K, V>),
    /// A value is stored for the key.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K: IntKey, V> Entry<'a, K, V> {
    /// The key this entry was looked up with.
    pub fn key(&self) -> K {
        match self {
            Entry::Vacant(entry) => entry.key,
            Entry::Occupied(entry) => entry.key(),
        }
    }

    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Modifies the value in place if the entry is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Inserts `V::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry of an [`IntTable`].
pub struct VacantEntry<'a, K: IntKey, V> {
    table: &'a mut IntTable<K, V>,
    index: usize,
    key: K,
    tombstone: bool,
}

impl<'a, K: IntKey, V> VacantEntry<'a, K, V> {
    /// The key this entry was looked up with.
    pub fn key(&self) -> K {
        self.key
    }

    /// Stores `value` for the entry's key and returns a mutable reference to
    /// it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        if self.tombstone {
            table.tombstones -= 1;
        }
        table.populated += 1;
        debug_assert!(table.populated + table.tombstones < table.capacity());

        table.keys[self.index] = self.key;
        table.states[self.index] = SlotState::Occupied;
        table.values[self.index].write(value)
    }
}

/// A view into an occupied entry of an [`IntTable`].
pub struct OccupiedEntry<'a, K: IntKey, V> {
    table: &'a mut IntTable<K, V>,
    index: usize,
}

impl<'a, K: IntKey, V> OccupiedEntry<'a, K, V> {
    /// The key stored in the entry.
    pub fn key(&self) -> K {
        self.table.keys[self.index]
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: occupied entries point at occupied slots.
        unsafe { self.table.values[self.index].assume_init_ref() }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: occupied entries point at occupied slots.
        unsafe { self.table.values[self.index].assume_init_mut() }
    }

    /// Converts the entry into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: occupied entries point at occupied slots.
        unsafe { self.table.values[self.index].assume_init_mut() }
    }

    /// Replaces the value in the entry, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, purging tombstones if the threshold is crossed.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the stored key and value.
    pub fn remove_entry(self) -> (K, V) {
        let entry = self.table.remove_at(self.index);
        self.table.maybe_purge_tombstones();
        entry
    }
}

/// An iterator over the entries of an [`IntTable`].
pub struct Iter<'a, K, V> {
    states: core::slice::Iter<'a, SlotState>,
    keys: core::slice::Iter<'a, K>,
    values: core::slice::Iter<'a, MaybeUninit<V>>,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            states: self.states.clone(),
            keys: self.keys.clone(),
            values: self.values.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K: Copy, V> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let state = self.states.next()?;
            let key = self.keys.next()?;
            let value = self.values.next()?;
            if *state == SlotState::Occupied {
                self.remaining -= 1;
                // SAFETY: occupied slots hold initialized values.
                return Some((*key, unsafe { value.assume_init_ref() }));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Copy, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K: Copy, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of an [`IntTable`].
pub struct IterMut<'a, K, V> {
    states: core::slice::Iter<'a, SlotState>,
    keys: core::slice::Iter<'a, K>,
    values: core::slice::IterMut<'a, MaybeUninit<V>>,
    remaining: usize,
}

impl<'a, K: Copy, V> Iterator for IterMut<'a, K, V> {
    type Item = (K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let state = self.states.next()?;
            let key = self.keys.next()?;
            let value = self.values.next()?;
            if *state == SlotState::Occupied {
                self.remaining -= 1;
                // SAFETY: occupied slots hold initialized values.
                return Some((*key, unsafe { value.assume_init_mut() }));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Copy, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K: Copy, V> FusedIterator for IterMut<'_, K, V> {}

/// An owning iterator over the entries of an [`IntTable`].
///
/// Entries not consumed are dropped with the iterator.
pub struct IntoIter<K: IntKey, V> {
    table: IntTable<K, V>,
    index: usize,
}

impl<K: IntKey, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let table = &mut self.table;
        while table.populated > 0 && self.index < table.states.len() {
            let index = self.index;
            self.index += 1;
            if table.states[index] == SlotState::Occupied {
                table.states[index] = SlotState::Empty;
                table.populated -= 1;
                // SAFETY: the slot was occupied and is now marked empty, so
                // the table's destructor will not drop it again.
                let value = unsafe { table.values[index].assume_init_read() };
                return Some((table.keys[index], value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<K: IntKey, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K: IntKey, V> FusedIterator for IntoIter<K, V> {}

impl<K: IntKey, V> IntoIterator for IntTable<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}

impl<'a, K: IntKey, V> IntoIterator for &'a IntTable<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A draining iterator over the entries of an [`IntTable`].
pub struct Drain<'a, K: IntKey, V> {
    inner: IntoIter<K, V>,
    _table: core::marker::PhantomData<&'a mut IntTable<K, V>>,
}

impl<K: IntKey, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: IntKey, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K: IntKey, V> FusedIterator for Drain<'_, K, V> {}

/// A cursor over an [`IntTable`] that can remove the entry it last yielded.
pub struct Cursor<'a, K: IntKey, V> {
    table: &'a mut IntTable<K, V>,
    index: usize,
    remaining: usize,
    current: Option<usize>,
}

impl<K: IntKey, V> Cursor<'_, K, V> {
    /// Advances to the next entry in slot order.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(K, &mut V)> {
        self.current = None;
        if self.remaining == 0 {
            return None;
        }

        while self.index < self.table.states.len() {
            let index = self.index;
            self.index += 1;
            if self.table.states[index] == SlotState::Occupied {
                self.remaining -= 1;
                self.current = Some(index);
                let key = self.table.keys[index];
                // SAFETY: occupied slots hold initialized values.
                return Some((key, unsafe { self.table.values[index].assume_init_mut() }));
            }
        }

        None
    }

    /// Removes the entry last returned by [`next`](Self::next).
    pub fn remove(&mut self) -> Option<V> {
        let index = self.current.take()?;
        Some(self.table.remove_at(index).1)
    }

    /// Number of entries the cursor has not reached yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

/// An iterator that removes and yields the entries of an [`IntTable`] that
/// satisfy a predicate.
pub struct ExtractIf<'a, K: IntKey, V, F> {
    cursor: Cursor<'a, K, V>,
    pred: F,
}

impl<K: IntKey, V, F> Iterator for ExtractIf<'_, K, V, F>
where
    F: FnMut(K, &mut V) -> bool,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, value)) = self.cursor.next() {
            if (self.pred)(key, value) {
                return self.cursor.remove().map(|value| (key, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.cursor.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn dense_keys_fill_home_slots() {
        let mut table = IntTable::new();
        for k in 0..8u32 {
            table.insert(k, k);
        }
        let hist = table.probe_histogram();
        assert_eq!(hist.bins(), &[8]);
        assert_eq!(table.debug_stats().max_probe_length, 0);
    }

    #[test]
    fn signed_keys_are_distinct() {
        let mut table = IntTable::new();
        for k in -50i32..50 {
            table.insert(k, k * 10);
        }
        assert_eq!(table.len(), 100);
        for k in -50i32..50 {
            assert_eq!(table.get(k), Some(&(k * 10)));
        }
        assert_eq!(table.get(50), None);
        assert_eq!((-1i8).hash_bits(), u64::MAX);
    }

    #[test]
    fn extreme_keys() {
        let mut table = IntTable::new();
        for k in [0u64, 1, u64::MAX, u64::MAX - 1, 1 << 63] {
            assert_eq!(table.insert(k, k), None);
        }
        for k in [0u64, 1, u64::MAX, u64::MAX - 1, 1 << 63] {
            assert_eq!(table.get(k), Some(&k));
        }
        assert_eq!(table.remove(0), Some(0));
        assert!(!table.contains_key(0));
        assert!(table.contains_key(u64::MAX));
    }

    #[test]
    fn grows_before_ninth_insert() {
        let mut table = IntTable::new();
        for k in 1..=20u32 {
            table.insert(k, ());
            let expected = match k {
                1..=8 => 16,
                9..=16 => 32,
                _ => 64,
            };
            assert_eq!(table.capacity(), expected, "after insert {k}");
        }
    }

    #[test]
    fn overwrite_at_growth_threshold_keeps_capacity() {
        let mut table = IntTable::new();
        for k in 0..8u32 {
            table.insert(k, k);
        }
        let mut cursor = table.cursor();
        while let Some((key, _)) = cursor.next() {
            if key == 5 {
                cursor.remove();
            }
        }
        table.insert(5, 5);
        let tombstones = table.tombstones();

        assert_eq!(table.insert(3, 99), Some(3));
        *table.entry(4).or_insert(0) += 1;
        table.entry(6).and_modify(|v| *v = 0);

        assert_eq!(table.capacity(), 16);
        assert_eq!(table.tombstones(), tombstones);
        assert_eq!(table.len(), 8);
        assert_eq!(table.get(3), Some(&99));
        assert_eq!(table.get(4), Some(&5));

        table.insert(8, 8);
        assert_eq!(table.capacity(), 32);
    }

    #[test]
    fn add_remove_add_same_key() {
        let mut table = IntTable::with_capacity(64);
        table.insert(5u32, ());
        table.remove(5);
        table.insert(5, ());

        assert!(table.contains_key(5));
        assert_eq!(table.len(), 1);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.iter().map(|(k, _)| k).collect::<Vec<_>>(), [5]);
        assert_eq!(table.debug_stats().populated, 1);
    }

    #[test]
    fn tombstone_threshold_triggers_rehash() {
        let mut table = IntTable::new();
        for k in 0..12u16 {
            table.insert(k, k);
        }
        assert_eq!(table.capacity(), 32);
        for k in 0..7u16 {
            table.remove(k);
        }
        assert_eq!(table.tombstones(), 7);
        table.remove(7);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.capacity(), 32);
        for k in 8..12u16 {
            assert_eq!(table.get(k), Some(&k));
        }
    }

    #[test]
    fn remove_when_checks_value() {
        let mut table = IntTable::new();
        table.insert(1u8, "a");
        assert_eq!(table.remove_when(1, |v| *v == "b"), None);
        assert_eq!(table.len(), 1);
        assert_eq!(table.remove_when(1, |v| *v == "a"), Some("a"));
        assert!(table.is_empty());
        assert_eq!(table.remove_when(1, |_| true), None);
    }

    #[test]
    fn entry_api() {
        let mut table: IntTable<u32, u32> = IntTable::new();
        *table.entry(3).or_insert(0) += 1;
        *table.entry(3).or_insert(0) += 1;
        table.entry(4).and_modify(|v| *v = 100).or_default();
        assert_eq!(table.get(3), Some(&2));
        assert_eq!(table.get(4), Some(&0));
        assert_eq!(table.entry(9).key(), 9);

        match table.entry(3) {
            Entry::Occupied(entry) => assert_eq!(entry.remove_entry(), (3, 2)),
            Entry::Vacant(_) => panic!("3 should be present: {table:?}"),
        }
        assert!(!table.contains_key(3));
    }

    #[test]
    fn cursor_does_not_resize() {
        let mut table: IntTable<u32, String> = (0..8).map(|k| (k, k.to_string())).collect();
        let capacity = table.capacity();

        let mut cursor = table.cursor();
        while let Some((key, value)) = cursor.next() {
            if key % 2 == 0 {
                assert_eq!(cursor.remove(), Some(key.to_string()));
            } else {
                value.push('!');
            }
        }
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.tombstones(), 4);
        assert_eq!(table.get(3).map(String::as_str), Some("3!"));
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn retain_and_extract_if() {
        let mut table: IntTable<i64, i64> = (0..40).map(|k| (k, -k)).collect();
        table.retain(|k, _| k % 4 != 0);
        assert_eq!(table.len(), 30);
        assert!(table.tombstones() * 4 < table.capacity());

        let mut odd: Vec<i64> = table.extract_if(|k, _| k % 2 == 1).map(|(k, _)| k).collect();
        odd.sort();
        assert_eq!(odd.len(), 20);
        assert_eq!(table.len(), 10);
        assert!(table.iter().all(|(k, v)| k % 4 == 2 && *v == -k));
    }

    #[test]
    fn values_are_dropped() {
        let drops = Rc::new(Cell::new(0));

        #[derive(Clone)]
        struct Tracked(Rc<Cell<usize>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut table = IntTable::new();
        for k in 0..20u32 {
            table.insert(k, Tracked(drops.clone()));
        }
        table.insert(0, Tracked(drops.clone()));
        assert_eq!(drops.get(), 1);

        drop(table.remove(1));
        assert_eq!(drops.get(), 2);

        let mut iter = table.clone().into_iter();
        iter.next();
        drop(iter);
        assert_eq!(drops.get(), 2 + 19);

        let mut drain = table.drain();
        drain.next();
        drop(drain);
        assert_eq!(drops.get(), 2 + 19 + 19);
        assert!(table.is_empty());

        for k in 0..5u32 {
            table.insert(k, Tracked(drops.clone()));
        }
        table.clear();
        assert_eq!(drops.get(), 2 + 19 + 19 + 5);

        table.insert(0, Tracked(drops.clone()));
        drop(table);
        assert_eq!(drops.get(), 2 + 19 + 19 + 5 + 1);
    }

    #[test]
    fn clone_is_independent() {
        let mut table: IntTable<u32, String> = (0..30).map(|k| (k, k.to_string())).collect();
        table.remove(4);
        let cloned = table.clone();
        table.insert(4, "four".to_string());

        assert_eq!(cloned.len(), 29);
        assert_eq!(cloned.tombstones(), table.tombstones() + 1);
        assert_eq!(cloned.get(4), None);
        assert_eq!(cloned.get(17).map(String::as_str), Some("17"));
    }

    #[test]
    fn reserve_and_shrink() {
        let mut table: IntTable<u32, ()> = IntTable::new();
        table.reserve(1000);
        assert_eq!(table.capacity(), 2048);
        for k in 0..1000 {
            table.insert(k, ());
        }
        assert_eq!(table.capacity(), 2048);
        table.retain(|k, _| k < 3);
        table.shrink_to_fit();
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn random_churn_matches_model() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut table: IntTable<u16, u32> = IntTable::new();
        let mut model = hashbrown::HashMap::new();

        for step in 0..20_000u32 {
            let key = rng.random_range(0..512u16);
            match rng.random_range(0..3) {
                0 | 1 => assert_eq!(table.insert(key, step), model.insert(key, step)),
                _ => assert_eq!(table.remove(key), model.remove(&key)),
            }
            assert_eq!(table.len(), model.len());
            assert!(table.len() + table.tombstones() < table.capacity());
        }

        for (key, value) in &model {
            assert_eq!(table.get(*key), Some(value));
        }
        assert_eq!(table.iter().count(), model.len());
    }
}
