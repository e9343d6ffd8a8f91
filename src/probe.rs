//! Double-hashing probe sequences and the slot scans shared by every table in
//! the crate.
//!
//! A table of capacity `C` (always a power of two) visits slots starting at
//! `hash & (C - 1)` and advancing by an odd step derived from a second mix of
//! the hash. An odd step is coprime to `C`, so the sequence is a permutation of
//! every slot index and a scan is guaranteed to reach an empty slot as long as
//! one exists.

/// Capacity of a freshly constructed table.
pub(crate) const INITIAL_CAPACITY: usize = 16;

/// The state of a single slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SlotState {
    /// Never written since the last grow or rehash. Terminates every probe.
    Empty,
    /// Previously occupied. Keeps probe chains that pass through it intact.
    Tombstone,
    /// Holds a live entry.
    Occupied,
}

/// Second hash used to derive the probe step.
///
/// This is the 64-bit finalizer from MurmurHash3. It is not keyed and provides
/// no protection against adversarial input.
#[inline]
pub(crate) fn double_hash(hash: u64) -> u64 {
    let mut x = hash;
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^ (x >> 33)
}

/// The sequence of slot indices visited for a given hash.
///
/// Yields exactly `mask + 1` indices, each slot once.
#[derive(Clone, Debug)]
pub(crate) struct ProbeSeq {
    pos: usize,
    step: usize,
    mask: usize,
    remaining: usize,
}

impl ProbeSeq {
    #[inline]
    pub(crate) fn new(hash: u64, mask: usize) -> Self {
        debug_assert!(mask.wrapping_add(1).is_power_of_two());
        Self {
            pos: hash as usize & mask,
            step: (double_hash(hash) as usize | 1) & mask,
            mask,
            remaining: mask.wrapping_add(1),
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let pos = self.pos;
        self.pos = pos.wrapping_add(self.step) & self.mask;
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Outcome of a scan performed on behalf of an insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Probe {
    /// A live slot whose entry matched.
    Occupied(usize),
    /// No match. `index` is where the new entry belongs; `tombstone` is set
    /// when that slot is a reused tombstone rather than an empty slot.
    Vacant { index: usize, tombstone: bool },
}

/// Looks up the slot holding a matching entry.
///
/// `eq` is only called for occupied slots.
///
/// # Panics
///
/// Panics if every slot was visited without reaching an empty one.
#[inline]
pub(crate) fn find(
    hash: u64,
    mask: usize,
    state: impl Fn(usize) -> SlotState,
    mut eq: impl FnMut(usize) -> bool,
) -> Option<usize> {
    for index in ProbeSeq::new(hash, mask) {
        match state(index) {
            SlotState::Empty => return None,
            SlotState::Occupied if eq(index) => return Some(index),
            SlotState::Occupied | SlotState::Tombstone => {}
        }
    }

    exhausted()
}

/// Looks up a matching entry, or the slot a new entry should be written to.
///
/// The scan must run until an empty slot to prove the key is absent, but the
/// first tombstone passed along the way is preferred as the insertion point.
///
/// # Panics
///
/// Panics if every slot was visited without reaching an empty one.
#[inline]
pub(crate) fn find_or_vacant(
    hash: u64,
    mask: usize,
    state: impl Fn(usize) -> SlotState,
    mut eq: impl FnMut(usize) -> bool,
) -> Probe {
    let mut first_tombstone = None;
    for index in ProbeSeq::new(hash, mask) {
        match state(index) {
            SlotState::Empty => {
                return match first_tombstone {
                    Some(index) => Probe::Vacant {
                        index,
                        tombstone: true,
                    },
                    None => Probe::Vacant {
                        index,
                        tombstone: false,
                    },
                };
            }
            SlotState::Tombstone => {
                if first_tombstone.is_none() {
                    first_tombstone = Some(index);
                }
            }
            SlotState::Occupied => {
                if eq(index) {
                    return Probe::Occupied(index);
                }
            }
        }
    }

    exhausted()
}

/// Finds the first empty slot for `hash`. Used when reinserting into a fresh
/// array that holds no tombstones and no duplicates.
///
/// # Panics
///
/// Panics if the array has no empty slot.
#[inline]
pub(crate) fn find_empty(hash: u64, mask: usize, state: impl Fn(usize) -> SlotState) -> usize {
    for index in ProbeSeq::new(hash, mask) {
        if state(index) == SlotState::Empty {
            return index;
        }
    }

    exhausted()
}

#[cold]
#[inline(never)]
#[track_caller]
fn exhausted() -> ! {
    panic!(
        "probe sequence visited every slot without reaching an empty one: the key's Hash and Eq \
         disagree or the table is corrupt"
    )
}

/// Smallest capacity that holds `entries` without growing.
///
/// # Panics
///
/// Panics if the capacity would overflow `usize`.
#[inline]
pub(crate) fn capacity_for(entries: usize) -> usize {
    entries
        .checked_mul(2)
        .and_then(usize::checked_next_power_of_two)
        .expect("capacity overflow")
        .max(INITIAL_CAPACITY)
}

/// Load-factor trigger, checked before a new entry is written.
#[inline(always)]
pub(crate) fn should_grow(len: usize, capacity: usize) -> bool {
    len * 2 >= capacity
}

/// Saturation trigger, checked before a new entry is written. Catches
/// tombstones that cursor removals left behind.
#[inline(always)]
pub(crate) fn should_compact(len: usize, tombstones: usize, capacity: usize) -> bool {
    (len + tombstones) * 4 >= capacity * 3
}

/// Tombstone-density trigger, checked after a removal.
#[inline(always)]
pub(crate) fn should_purge(tombstones: usize, capacity: usize) -> bool {
    tombstones * 4 >= capacity
}

/// What must happen to the table before a new entry is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resize {
    None,
    Grow(usize),
    Rehash,
}

#[inline]
pub(crate) fn before_insert(len: usize, tombstones: usize, capacity: usize) -> Resize {
    if should_grow(len, capacity) {
        Resize::Grow(capacity.checked_mul(2).expect("capacity overflow"))
    } else if should_compact(len, tombstones, capacity) {
        Resize::Rehash
    } else {
        Resize::None
    }
}
