#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod probe;

/// Utilization statistics for tables, maps and sets.
#[cfg(any(test, feature = "stats"))]
pub mod stats;

/// A HashMap built on the open-addressing [`HashTable`].
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

pub mod hash_table;

/// A hash set built on the open-addressing [`HashTable`].
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

/// A map keyed by primitive integers, built on [`IntTable`].
pub mod int_map;

pub mod int_table;

/// A set of primitive integers, built on [`IntTable`].
pub mod int_set;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use int_map::IntMap;
pub use int_set::IntSet;
pub use int_table::IntKey;
pub use int_table::IntTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`HashMap`] and [`HashSet`] unless one is
        /// supplied.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`HashMap`] and [`HashSet`] unless one is
        /// supplied.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        compile_error!("either the `foldhash` or the `std` feature must be enabled");
    }
}
