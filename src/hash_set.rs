use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// A hash set backed by an open-addressing [`HashTable`].
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values.
///
/// # Performance Characteristics
///
/// - **Memory**: one slot per capacity unit holding `T`, a `u64` hash and a
///   discriminant.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hash_builder: S,
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> HashSet<T, S> {
    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
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

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Clears the set, removing all values. Keeps the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rebuilds the set in place, purging tombstones.
    pub fn rehash(&mut self) {
        self.table.rehash();
    }

    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// An iterator visiting all elements in slot order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all elements in an iterator.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Returns a cursor that can remove the element it last yielded.
    ///
    /// Removals through the cursor leave tombstones and never resize the set.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor {
            inner: self.table.cursor(),
        }
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::HashSet;
    /// #
    /// let mut set: HashSet<i32> = (1..=6).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 3);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(&*v));
    }

    /// Creates an iterator that removes and yields the elements for which `f`
    /// returns `true`.
    pub fn extract_if<F>(&mut self, f: F) -> ExtractIf<'_, T, F>
    where
        F: FnMut(&T) -> bool,
    {
        ExtractIf {
            cursor: self.table.cursor(),
            pred: f,
        }
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

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::collections::hash_map::RandomState;
    ///
    /// use probe_hash::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash set that holds at least `capacity` elements without
    /// growing, using the given hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already in
    /// the set is left in place.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::HashSet;
    /// #
    /// let mut set = HashSet::new();
    /// assert!(set.insert(5));
    /// set.remove(&5);
    /// assert!(set.insert(5));
    /// assert!(!set.insert(5));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(hash, |v| *v == value) {
            TableEntry::Occupied(_) => false,
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Returns `true` if the set contains a value.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(value).is_some()
    }

    /// Returns a reference to the stored value equal to the given value.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the stored value equal to the given value.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Adds a value to the set, replacing and returning an equal value that
    /// was already stored.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(hash, |v| *v == value) {
            TableEntry::Occupied(mut entry) => Some(entry.insert(value)),
            TableEntry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    pub fn is_disjoint(&self, other: &HashSet<T, S>) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &HashSet<T, S>) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every element of `other` is in `self`.
    pub fn is_superset(&self, other: &HashSet<T, S>) -> bool {
        other.is_subset(self)
    }

    /// Returns an iterator over the union of `self` and `other`, without
    /// duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::HashSet;
    /// #
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let mut union: Vec<_> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3]);
    /// ```
    pub fn union<'a>(&'a self, other: &'a HashSet<T, S>) -> Union<'a, T, S> {
        let (larger, smaller) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Union {
            iter: larger.iter(),
            other_iter: smaller.iter(),
            other_set: larger,
        }
    }

    /// Returns an iterator over the elements present in both sets.
    pub fn intersection<'a>(&'a self, other: &'a HashSet<T, S>) -> Intersection<'a, T, S> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Returns an iterator over the elements in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, S>) -> Difference<'a, T, S> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Returns an iterator over the elements in exactly one of the two sets.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, S>,
    ) -> SymmetricDifference<'a, T, S> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T> HashSet<T, DefaultHashBuilder> {
    /// Creates a new hash set using the default hasher builder.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new hash set that holds at least `capacity` elements without
    /// growing, using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::HashSet;
    /// #
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 200);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder: DefaultHashBuilder::default(),
        }
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> IntoIterator for HashSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S> Extend<&'a T> for HashSet<T, S>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: crate::hash_table::Iter<'a, T>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T> {
    inner: crate::hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

/// An owning iterator over the values of a `HashSet`.
pub struct IntoIter<T> {
    inner: crate::hash_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

/// A cursor over a `HashSet` that can remove the element it last yielded.
pub struct Cursor<'a, T> {
    inner: crate::hash_table::Cursor<'a, T>,
}

impl<T> Cursor<'_, T> {
    /// Advances to the next element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&T> {
        self.inner.next().map(|v| &*v)
    }

    /// Removes the element last returned by [`next`](Self::next).
    pub fn remove(&mut self) -> Option<T> {
        self.inner.remove()
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S> {
    iter: Iter<'a, T>,
    other_iter: Iter<'a, T>,
    other_set: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Union<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.iter.next() {
            return Some(v);
        }
        self.other_iter.by_ref().find(|v| !self.other_set.contains(*v))
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Intersection<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let other = self.other;
        self.iter.find(|v| other.contains(*v))
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Difference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let other = self.other;
        self.iter.find(|v| !other.contains(*v))
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S> {
    iter: core::iter::Chain<Difference<'a, T, S>, Difference<'a, T, S>>,
}

impl<'a, T, S> Iterator for SymmetricDifference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// An iterator that removes and yields the elements of a `HashSet` that
/// satisfy a predicate.
pub struct ExtractIf<'a, T, F> {
    cursor: crate::hash_table::Cursor<'a, T>,
    pred: F,
}

impl<T, F> Iterator for ExtractIf<'_, T, F>
where
    F: FnMut(&T) -> bool,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(v) = self.cursor.next() {
            if (self.pred)(&*v) {
                return self.cursor.remove();
            }
        }
        None
    }
}
