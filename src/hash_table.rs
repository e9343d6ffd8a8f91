//! An open-addressing hash table with double hashing and tombstone deletion.
//!
//! [`HashTable`] is the raw engine behind [`HashMap`](crate::HashMap) and
//! [`HashSet`](crate::HashSet). It never hashes anything itself: every
//! operation takes a precomputed 64-bit hash and an equality predicate.

use alloc::boxed::Box;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::probe;
use crate::probe::Probe;
use crate::probe::Resize;
use crate::probe::SlotState;

#[derive(Clone)]
enum Slot<V> {
    Empty,
    Tombstone,
    Occupied { hash: u64, value: V },
}

impl<V> Slot<V> {
    #[inline(always)]
    fn state(&self) -> SlotState {
        match self {
            Slot::Empty => SlotState::Empty,
            Slot::Tombstone => SlotState::Tombstone,
            Slot::Occupied { .. } => SlotState::Occupied,
        }
    }

    #[inline(always)]
    fn matches(&self, hash: u64, eq: &impl Fn(&V) -> bool) -> bool {
        match self {
            Slot::Occupied { hash: h, value } => *h == hash && eq(value),
            _ => false,
        }
    }

    #[inline(always)]
    fn value(&self) -> Option<&V> {
        match self {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    #[inline(always)]
    fn value_mut(&mut self) -> Option<&mut V> {
        match self {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        }
    }

    #[inline(always)]
    fn occupy(&mut self, hash: u64, value: V) -> &mut V {
        *self = Slot::Occupied { hash, value };
        match self {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("slot was just occupied"),
        }
    }
}

fn empty_slots<V>(capacity: usize) -> Box<[Slot<V>]> {
    (0..capacity).map(|_| Slot::Empty).collect()
}

/// A hash table using open addressing with double hashing.
///
/// `HashTable<V>` stores values of type `V`. Callers supply the hash of each
/// value along with an equality predicate, which makes it suitable for
/// building maps and sets with arbitrary key extraction.
///
/// Removal leaves a tombstone in place of the entry so that probe chains
/// running through the slot stay intact. Tombstones are purged by rebuilding
/// the table in place once they make up a quarter of the slots.
///
/// ## Performance Characteristics
///
/// - **Memory**: one slot per capacity unit holding `V`, a `u64` hash and a
///   discriminant. Capacity is kept at least twice the number of entries.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use probe_hash::hash_table::Entry;
/// # use probe_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).map(|p| p.name.as_str()), Some("Alice"));
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Box<[Slot<V>]>,
    populated: usize,
    tombstones: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        let strip: String = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Empty => '.',
                Slot::Tombstone => 'x',
                Slot::Occupied { .. } => '#',
            })
            .collect();

        f.debug_struct("HashTable")
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.capacity())
            .field("slots", &strip)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with the initial capacity of 16 slots.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a table that can hold at least `capacity` entries without
    /// growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 200);
    /// assert!(table.capacity().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(probe::capacity_for(capacity)),
            populated: 0,
            tombstones: 0,
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots in the table. Always a power of two.
    ///
    /// The table grows once half of its slots are occupied.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of tombstones currently in the table.
    ///
    /// Removals through a [`Cursor`] leave tombstones behind without purging
    /// them; call [`rehash`](Self::rehash) afterwards to reclaim the slots.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(42, |&n: &u64| n == 7).or_insert(7);
    ///
    /// assert_eq!(table.find(42, |&n| n == 7), Some(&7));
    /// assert_eq!(table.find(42, |&n| n == 8), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        self.find_index(hash, &eq)
            .and_then(|index| self.slots[index].value())
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, &eq)?;
        self.slots[index].value_mut()
    }

    #[inline]
    fn find_index(&self, hash: u64, eq: &impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        let slots = &self.slots;
        probe::find(
            hash,
            self.mask(),
            |i| slots[i].state(),
            |i| slots[i].matches(hash, eq),
        )
    }

    /// Finds an existing entry by hash and equality predicate.
    ///
    /// Unlike [`entry`](Self::entry) this never resizes the table, so it is the
    /// right starting point for conditional removal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |&(k, _): &(u32, u32)| k == 1).or_insert((1, 10));
    ///
    /// if let Some(entry) = table.find_entry(1, |&(k, _)| k == 1) {
    ///     if entry.get().1 == 10 {
    ///         entry.remove();
    ///     }
    /// }
    /// assert!(table.is_empty());
    /// ```
    pub fn find_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
    ) -> Option<OccupiedEntry<'_, V>> {
        let index = self.find_index(hash, &eq)?;
        Some(OccupiedEntry { table: self, index })
    }

    /// Gets the entry for the given hash and equality predicate.
    ///
    /// A match never resizes. When the key is absent and the table is half
    /// full, it doubles before the vacant entry is returned, so the entry can
    /// always be filled.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::Entry;
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// match table.entry(17, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// let value = table.entry(17, |s: &String| s == "hello").or_insert("other".to_string());
    /// assert_eq!(value, "hello");
    /// ```
    #[inline]
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        let mut probe = self.probe_for_insert(hash, &eq);
        if matches!(probe, Probe::Vacant { .. }) && self.maybe_resize_rehash() {
            probe = self.probe_for_insert(hash, &eq);
        }

        match probe {
            Probe::Occupied(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Probe::Vacant { index, tombstone } => Entry::Vacant(VacantEntry {
                table: self,
                index,
                hash,
                tombstone,
            }),
        }
    }

    /// Removes and returns a value from the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// assert_eq!(table.tombstones(), 1);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        self.find_entry(hash, eq).map(OccupiedEntry::remove)
    }

    /// Turns the slot at `index` into a tombstone and returns its value.
    /// Never resizes.
    fn remove_at(&mut self, index: usize) -> V {
        match core::mem::replace(&mut self.slots[index], Slot::Tombstone) {
            Slot::Occupied { value, .. } => {
                self.populated -= 1;
                self.tombstones += 1;
                value
            }
            other => {
                self.slots[index] = other;
                unreachable!("removed slot {index} was not occupied")
            }
        }
    }

    /// Removes all elements from the table, keeping its capacity.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = Slot::Empty);
        self.populated = 0;
        self.tombstones = 0;
    }

    /// Rebuilds the table at its current capacity, purging all tombstones.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(64);
    /// for i in 0..10u64 {
    ///     table.entry(i, |&n: &u64| n == i).or_insert(i);
    /// }
    ///
    /// let mut cursor = table.cursor();
    /// while let Some(v) = cursor.next() {
    ///     if *v % 2 == 0 {
    ///         cursor.remove();
    ///     }
    /// }
    /// assert_eq!(table.tombstones(), 5);
    ///
    /// table.rehash();
    /// assert_eq!(table.tombstones(), 0);
    /// assert_eq!(table.len(), 5);
    /// ```
    pub fn rehash(&mut self) {
        self.resize(self.capacity());
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let required = probe::capacity_for(self.populated.saturating_add(additional));
        if required > self.capacity() {
            self.resize(required);
        }
    }

    /// Shrinks the table to the smallest capacity that holds its entries.
    ///
    /// Tombstones are purged even when the capacity does not change.
    pub fn shrink_to_fit(&mut self) {
        let required = probe::capacity_for(self.populated);
        if required < self.capacity() || self.tombstones > 0 {
            self.resize(required);
        }
    }

    #[inline]
    fn probe_for_insert(&self, hash: u64, eq: &impl Fn(&V) -> bool) -> Probe {
        let slots = &self.slots;
        probe::find_or_vacant(
            hash,
            self.mask(),
            |i| slots[i].state(),
            |i| slots[i].matches(hash, eq),
        )
    }

    /// Grows or compacts ahead of writing a new entry. Returns `true` if the
    /// slots moved.
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
        debug_assert!(capacity.is_power_of_two());
        debug_assert!(self.populated < capacity);

        let old = core::mem::replace(&mut self.slots, empty_slots(capacity));
        let mask = capacity - 1;
        for slot in old.into_vec() {
            if let Slot::Occupied { hash, value } = slot {
                let slots = &self.slots;
                let index = probe::find_empty(hash, mask, |i| slots[i].state());
                self.slots[index] = Slot::Occupied { hash, value };
            }
        }
        self.tombstones = 0;
    }

    /// Returns an iterator over all values in the table, in slot order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            slots: self.slots.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The table is emptied immediately and keeps its capacity. Values not
    /// consumed by the iterator are dropped along with it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// table.entry(2, |&n: &u64| n == 2).or_insert(2);
    ///
    /// let mut values: Vec<u64> = table.drain().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2]);
    /// assert!(table.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        let capacity = self.capacity();
        let slots = core::mem::replace(&mut self.slots, empty_slots(capacity));
        let remaining = core::mem::replace(&mut self.populated, 0);
        self.tombstones = 0;

        Drain {
            inner: IntoIter {
                slots: slots.into_vec().into_iter(),
                remaining,
            },
            _table: PhantomData,
        }
    }

    /// Returns a cursor over the table that can remove the value it last
    /// yielded.
    ///
    /// Removal through the cursor leaves a tombstone and never resizes or
    /// rehashes the table, so the walk stays valid. Call
    /// [`rehash`](Self::rehash) afterwards if many values were removed.
    pub fn cursor(&mut self) -> Cursor<'_, V> {
        let remaining = self.populated;
        Cursor {
            table: self,
            index: 0,
            remaining,
            current: None,
        }
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// Tombstones are purged once the walk completes if they crossed the
    /// purge threshold.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for i in 0..6u64 {
    ///     table.entry(i, |&n: &u64| n == i).or_insert(i);
    /// }
    ///
    /// table.retain(|v| *v % 3 == 0);
    /// assert_eq!(table.len(), 2);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        let mut cursor = self.cursor();
        while let Some(value) = cursor.next() {
            if !f(value) {
                cursor.remove();
            }
        }
        self.maybe_purge_tombstones();
    }

    /// Creates an iterator that removes and yields the values for which `f`
    /// returns `true`.
    ///
    /// Values the iterator never reaches, because it was dropped early, stay
    /// in the table.
    pub fn extract_if<F>(&mut self, f: F) -> ExtractIf<'_, V, F>
    where
        F: FnMut(&mut V) -> bool,
    {
        ExtractIf {
            cursor: self.cursor(),
            pred: f,
        }
    }

    fn occupied(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { hash, .. } => Some((index, *hash)),
                _ => None,
            })
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

    #[cfg(any(test, feature = "stats"))]
    fn collect_stats(&self) -> (crate::stats::DebugStats, crate::stats::ProbeHistogram) {
        crate::stats::collect(
            self.mask(),
            self.populated,
            self.tombstones,
            core::mem::size_of_val::<[Slot<V>]>(&self.slots),
            self.occupied(),
        )
    }

    #[cfg(test)]
    fn count_states(&self) -> (usize, usize) {
        let occupied = self.occupied().count();
        let tombstones = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Tombstone))
            .count();
        (occupied, tombstones)
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - no matching value is present in the table
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(9, |&n: &u32| n == 9).or_insert_with(|| 9);
    /// table
    ///     .entry(9, |&n: &u32| n == 9)
    ///     .or_insert_with(|| panic!("Should not be called"));
    /// assert_eq!(table.len(), 1);
    /// ```
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

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
    hash: u64,
    tombstone: bool,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant entry and returns a mutable reference to
    /// it.
    pub fn insert(self, value: V) -> &'a mut V {
        if self.tombstone {
            self.table.tombstones -= 1;
        }
        self.table.populated += 1;
        debug_assert!(self.table.populated + self.table.tombstones < self.table.capacity());

        self.table.slots[self.index].occupy(self.hash, value)
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    fn slot_value(&self) -> &V {
        match &self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("occupied entry points at a vacant slot"),
        }
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.slot_value()
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        match &mut self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("occupied entry points at a vacant slot"),
        }
    }

    /// Converts the entry into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut V {
        match &mut self.table.slots[self.index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("occupied entry points at a vacant slot"),
        }
    }

    /// Replaces the value in the entry, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the value from the table.
    ///
    /// Purges tombstones if the removal pushes them past a quarter of the
    /// table.
    pub fn remove(self) -> V {
        let value = self.table.remove_at(self.index);
        self.table.maybe_purge_tombstones();
        value
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    slots: core::slice::Iter<'a, Slot<V>>,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let value = self.slots.find_map(Slot::value)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values in a [`HashTable`].
pub struct IterMut<'a, V> {
    slots: core::slice::IterMut<'a, Slot<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let value = self.slots.find_map(Slot::value_mut)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    slots: alloc::vec::IntoIter<Slot<V>>,
    remaining: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let value = self.slots.find_map(|slot| match slot {
            Slot::Occupied { value, .. } => Some(value),
            _ => None,
        })?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}
impl<V> FusedIterator for IntoIter<V> {}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots.into_vec().into_iter(),
            remaining: self.populated,
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    inner: IntoIter<V>,
    _table: PhantomData<&'a mut HashTable<V>>,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}
impl<V> FusedIterator for Drain<'_, V> {}

/// A cursor over the values of a [`HashTable`] that can remove the value it
/// last yielded.
///
/// This struct is created by the [`cursor`] method on [`HashTable`]. It is a
/// lending iterator, so it is driven with `while let` rather than `for`.
///
/// [`cursor`]: HashTable::cursor
pub struct Cursor<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
    remaining: usize,
    current: Option<usize>,
}

impl<V> Cursor<'_, V> {
    /// Advances to the next value in slot order.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&mut V> {
        self.current = None;
        if self.remaining == 0 {
            return None;
        }

        let capacity = self.table.capacity();
        while self.index < capacity {
            let index = self.index;
            self.index += 1;
            if self.table.slots[index].state() == SlotState::Occupied {
                self.remaining -= 1;
                self.current = Some(index);
                return self.table.slots[index].value_mut();
            }
        }

        None
    }

    /// Removes the value last returned by [`next`](Self::next).
    ///
    /// Returns `None` if there is no current value, either because `next` has
    /// not been called or because the value was already removed.
    pub fn remove(&mut self) -> Option<V> {
        let index = self.current.take()?;
        Some(self.table.remove_at(index))
    }

    /// Number of values the cursor has not reached yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

/// An iterator that removes and yields the values of a [`HashTable`] that
/// satisfy a predicate.
pub struct ExtractIf<'a, V, F> {
    cursor: Cursor<'a, V>,
    pred: F,
}

impl<V, F> Iterator for ExtractIf<'_, V, F>
where
    F: FnMut(&mut V) -> bool,
{
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(value) = self.cursor.next() {
            if (self.pred)(value) {
                return self.cursor.remove();
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
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert(table: &mut HashTable<Item>, state: &HashState, key: u64, value: i32) {
        let hash = hash_key(state, key);
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(_) => panic!("unexpected occupied for {key}: {table:#?}"),
        }
    }

    #[test]
    fn starts_at_sixteen_slots() {
        let table: HashTable<u64> = HashTable::new();
        assert_eq!(table.capacity(), 16);
        assert!(table.is_empty());
        assert_eq!(table.tombstones(), 0);
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..32u64 {
            insert(&mut table, &state, k, (k as i32) * 2);
            assert_eq!(
                table.find(hash_key(&state, k), |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{table:#?}"
            );
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).map(|v| v.value), Some(k as i32 * 2));
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);
        insert(&mut table, &state, k, 7);

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev = occ.insert(Item { key: k, value: 11 });
                assert_eq!(prev.value, 7);
            }
            Entry::Vacant(_) => panic!("should be occupied: {k}#{hash:02X} in {table:#?}"),
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(hash, |v| v.key == k).map(|v| v.value), Some(11));
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        insert(&mut table, &state, 5, 1);

        let hash = hash_key(&state, 5);
        if let Some(v) = table.find_mut(hash, |v| v.key == 5) {
            v.value = 99;
        }
        assert_eq!(table.find(hash, |v| v.key == 5).map(|v| v.value), Some(99));
        assert!(table.find_mut(hash_key(&state, 6), |v| v.key == 6).is_none());
    }

    #[test]
    fn grows_before_ninth_insert() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 1..=20u64 {
            insert(&mut table, &state, k, 0);
            match k {
                1..=8 => assert_eq!(table.capacity(), 16, "after insert {k}"),
                9..=16 => assert_eq!(table.capacity(), 32, "after insert {k}"),
                _ => assert_eq!(table.capacity(), 64, "after insert {k}"),
            }
        }
        for k in 1..=20u64 {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_some());
        }
    }

    #[test]
    fn overwrite_at_growth_threshold_keeps_capacity() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            insert(&mut table, &state, k, 0);
        }

        let mut cursor = table.cursor();
        while let Some(v) = cursor.next() {
            if v.key == 0 {
                cursor.remove();
            }
        }
        insert(&mut table, &state, 0, 0);
        assert_eq!(table.len(), 8);
        let tombstones = table.tombstones();

        let hash = hash_key(&state, 3);
        match table.entry(hash, |v| v.key == 3) {
            Entry::Occupied(mut occ) => {
                occ.insert(Item { key: 3, value: 99 });
            }
            Entry::Vacant(_) => panic!("3 should be present: {table:#?}"),
        }
        table.entry(hash, |v| v.key == 3).and_modify(|v| v.value += 1);

        assert_eq!(table.capacity(), 16);
        assert_eq!(table.tombstones(), tombstones);
        assert_eq!(table.find(hash, |v| v.key == 3).map(|v| v.value), Some(100));

        insert(&mut table, &state, 8, 0);
        assert_eq!(table.capacity(), 32);
    }

    #[test]
    fn capacity_covers_inserted_entries() {
        let state = HashState::default();
        for n in [1usize, 7, 8, 9, 100, 1000] {
            let mut table: HashTable<Item> = HashTable::new();
            for k in 0..n as u64 {
                insert(&mut table, &state, k, 0);
            }
            assert!(table.capacity().is_power_of_two());
            assert!(table.capacity() >= (2 * n).next_power_of_two(), "n = {n}");
        }
    }

    #[test]
    fn remove_leaves_tombstone() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(64);
        for k in 0..10u64 {
            insert(&mut table, &state, k, k as i32);
        }

        let hash = hash_key(&state, 3);
        assert_eq!(table.remove(hash, |v| v.key == 3).map(|v| v.value), Some(3));
        assert_eq!(table.len(), 9);
        assert_eq!(table.tombstones(), 1);
        assert_eq!(table.count_states(), (9, 1));

        assert_eq!(table.remove(hash, |v| v.key == 3), None);
        assert_eq!(table.len(), 9);
        assert_eq!(table.tombstones(), 1);

        for k in (0..10u64).filter(|&k| k != 3) {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_some());
        }
    }

    #[test]
    fn reinsert_after_remove_reuses_slot() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(64);
        insert(&mut table, &state, 5, 1);
        let hash = hash_key(&state, 5);
        table.remove(hash, |v| v.key == 5);
        insert(&mut table, &state, 5, 2);

        assert_eq!(table.len(), 1);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.count_states(), (1, 0));
        assert_eq!(table.iter().count(), 1);
        assert_eq!(table.find(hash, |v| v.key == 5).map(|v| v.value), Some(2));
    }

    #[test]
    fn tombstone_threshold_triggers_rehash() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..12u64 {
            insert(&mut table, &state, k, k as i32);
        }
        assert_eq!(table.capacity(), 32);

        for k in 0..7u64 {
            table.remove(hash_key(&state, k), |v| v.key == k);
            assert_eq!(table.tombstones(), k as usize + 1);
        }
        table.remove(hash_key(&state, 7), |v| v.key == 7);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.capacity(), 32);
        assert_eq!(table.len(), 4);
        assert_eq!(table.count_states(), (4, 0));

        for k in 8..12u64 {
            assert_eq!(
                table.find(hash_key(&state, k), |v| v.key == k).map(|v| v.value),
                Some(k as i32)
            );
        }
    }

    #[test]
    fn saturation_is_compacted_on_insert() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            insert(&mut table, &state, k, 0);
        }
        assert_eq!(table.capacity(), 16);

        let mut cursor = table.cursor();
        while cursor.next().is_some() {
            cursor.remove();
        }
        assert_eq!(table.len(), 0);
        assert_eq!(table.tombstones(), 8);

        for k in 100..108u64 {
            insert(&mut table, &state, k, 0);
            let stats = table.debug_stats();
            assert!(stats.empty_slots > 0, "{stats:?}");
        }
        for k in 100..108u64 {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_some());
        }
    }

    #[test]
    fn churn_never_exhausts_probe() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for round in 0..50u64 {
            for k in 0..40u64 {
                insert(&mut table, &state, round * 1000 + k, 0);
            }
            for k in 0..40u64 {
                let key = round * 1000 + k;
                assert!(table.remove(hash_key(&state, key), |v| v.key == key).is_some());
            }
            assert!(table.is_empty());
            let (occupied, tombstones) = table.count_states();
            assert_eq!(occupied, 0);
            assert_eq!(tombstones, table.tombstones());
        }
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            match table.entry(0xABCD, |v| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(Item { key: k, value: 0 });
                }
                Entry::Occupied(_) => unreachable!(),
            }
        }
        assert_eq!(table.len(), 8);
        for k in 0..8u64 {
            assert!(table.find(0xABCD, |v| v.key == k).is_some());
        }
        let hist = table.probe_histogram();
        assert_eq!(hist.bins()[0], 1);
        assert_eq!(hist.total(), 8);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..20u64 {
            insert(&mut table, &state, k, k as i32);
        }

        let iter = table.iter();
        assert_eq!(iter.len(), 20);
        let mut keys: Vec<u64> = iter.map(|v| v.key).collect();
        keys.sort();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());

        for v in table.iter_mut() {
            v.value += 1;
        }
        assert!(table.iter().all(|v| v.value == v.key as i32 + 1));

        let capacity = table.capacity();
        let drained: Vec<Item> = table.drain().collect();
        assert_eq!(drained.len(), 20);
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.count_states(), (0, 0));
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn partial_drain_still_empties() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert(&mut table, &state, k, 0);
        }

        let mut drain = table.drain();
        assert!(drain.next().is_some());
        drop(drain);

        assert!(table.is_empty());
        insert(&mut table, &state, 3, 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn cursor_remove_does_not_resize() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            insert(&mut table, &state, k, k as i32);
        }
        let capacity = table.capacity();

        let mut seen = 0;
        let mut cursor = table.cursor();
        assert!(cursor.remove().is_none());
        while let Some(v) = cursor.next() {
            seen += 1;
            if v.key % 2 == 0 {
                assert!(cursor.remove().is_some());
                assert!(cursor.remove().is_none());
            }
        }
        assert_eq!(seen, 8);

        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.len(), 4);
        assert_eq!(table.tombstones(), 4);
        for k in 0..8u64 {
            let found = table.find(hash_key(&state, k), |v| v.key == k).is_some();
            assert_eq!(found, k % 2 == 1);
        }

        table.rehash();
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn retain_and_extract_if() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..30u64 {
            insert(&mut table, &state, k, k as i32);
        }

        table.retain(|v| v.key % 3 != 0);
        assert_eq!(table.len(), 20);

        let mut extracted: Vec<u64> = table.extract_if(|v| v.key < 10).map(|v| v.key).collect();
        extracted.sort();
        assert_eq!(extracted, [1, 2, 4, 5, 7, 8]);
        assert_eq!(table.len(), 14);
        assert!(table.iter().all(|v| v.key >= 10 && v.key % 3 != 0));
    }

    #[test]
    fn reserve_and_shrink() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        table.reserve(100);
        assert!(table.capacity() >= 200);
        let capacity = table.capacity();
        for k in 0..100u64 {
            insert(&mut table, &state, k, 0);
        }
        assert_eq!(table.capacity(), capacity);

        for k in 0..95u64 {
            table.remove(hash_key(&state, k), |v| v.key == k);
        }
        table.shrink_to_fit();
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.tombstones(), 0);
        for k in 95..100u64 {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_some());
        }
    }

    #[test]
    fn clear_resets_everything() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..10u64 {
            insert(&mut table, &state, k, 0);
        }
        table.remove(hash_key(&state, 0), |v| v.key == 0);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.count_states(), (0, 0));
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    #[test]
    fn string_keys() {
        let state = HashState::default();
        let mut table: HashTable<(String, u32)> = HashTable::new();
        let words = ["alpha", "beta", "gamma", "delta", "epsilon"];
        for (i, w) in words.iter().enumerate() {
            table
                .entry(hash_string_key(&state, w), |(k, _)| k == w)
                .or_insert((w.to_string(), i as u32));
        }
        for (i, w) in words.iter().enumerate() {
            assert_eq!(
                table
                    .find(hash_string_key(&state, w), |(k, _)| k == w)
                    .map(|(_, v)| *v),
                Some(i as u32)
            );
        }
        let removed = table.remove(hash_string_key(&state, "gamma"), |(k, _)| k == "gamma");
        assert_eq!(removed, Some(("gamma".to_string(), 2)));
    }

    #[test]
    fn entry_helpers() {
        let mut table: HashTable<(u32, u32)> = HashTable::new();
        *table.entry(1, |&(k, _)| k == 1).or_insert((1, 0)) = (1, 5);
        table.entry(1, |&(k, _)| k == 1).and_modify(|v| v.1 += 1);
        assert_eq!(table.find(1, |&(k, _)| k == 1), Some(&(1, 6)));

        let v = table.entry(2, |&(k, _)| k == 2).or_default();
        assert_eq!(*v, (0, 0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn clone_preserves_contents() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..40u64 {
            insert(&mut table, &state, k, k as i32);
        }
        table.remove(hash_key(&state, 7), |v| v.key == 7);

        let cloned = table.clone();
        assert_eq!(cloned.len(), table.len());
        assert_eq!(cloned.tombstones(), table.tombstones());
        for k in 0..40u64 {
            assert_eq!(
                cloned.find(hash_key(&state, k), |v| v.key == k),
                table.find(hash_key(&state, k), |v| v.key == k)
            );
        }
    }

    #[test]
    fn debug_shows_slot_states() {
        let mut table: HashTable<u32> = HashTable::new();
        table.entry(0, |&v| v == 0).or_insert(0);
        let rendered = alloc::format!("{table:?}");
        assert!(rendered.contains("populated: 1"));
        assert!(rendered.contains('#'));
    }
}
