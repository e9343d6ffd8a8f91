//! Introspection for table layout, compiled under `cfg(test)` or the `stats`
//! feature.

use alloc::vec;
use alloc::vec::Vec;

use crate::probe::ProbeSeq;

/// Debug statistics for hash table analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of live entries.
    pub populated: usize,
    /// Number of tombstone slots.
    pub tombstones: usize,
    /// Total number of slots allocated.
    pub capacity: usize,
    /// Number of never-used slots.
    pub empty_slots: usize,
    /// `populated / capacity`.
    pub load_factor: f64,
    /// `tombstones / capacity`.
    pub tombstone_ratio: f64,
    /// Longest distance, in probe steps, between an entry and its home slot.
    pub max_probe_length: usize,
    /// Mean distance, in probe steps, between an entry and its home slot.
    pub mean_probe_length: f64,
    /// Bytes allocated for slots and side arrays.
    pub total_bytes: usize,
}

impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Tombstones: {} ({:.2}% of slots), {} slots never used",
            self.tombstones,
            self.tombstone_ratio * 100.0,
            self.empty_slots
        );
        println!(
            "Probe length: max {}, mean {:.3}",
            self.max_probe_length, self.mean_probe_length
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Count of entries by probe distance from their home slot.
///
/// Bin `i` counts entries found after `i` steps, so bin 0 holds entries that
/// sit in their home slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeHistogram {
    bins: Vec<usize>,
}

impl ProbeHistogram {
    /// The histogram bins.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = *self.bins.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.total());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(partial[units % 8 - 1]);
            }
            bar
        };

        for (i, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", i, make_bar(count), count);
        }
    }
}

/// Number of steps from `hash`'s home slot to `index`.
pub(crate) fn probe_length(hash: u64, mask: usize, index: usize) -> usize {
    ProbeSeq::new(hash, mask)
        .position(|i| i == index)
        .unwrap_or(mask)
}

/// Builds statistics from the occupied `(index, hash)` pairs of a table.
pub(crate) fn collect(
    mask: usize,
    populated: usize,
    tombstones: usize,
    total_bytes: usize,
    occupied: impl Iterator<Item = (usize, u64)>,
) -> (DebugStats, ProbeHistogram) {
    let capacity = mask + 1;
    let mut bins = vec![0usize; 1];
    let mut probe_sum = 0usize;

    for (index, hash) in occupied {
        let len = probe_length(hash, mask, index);
        if len >= bins.len() {
            bins.resize(len + 1, 0);
        }
        bins[len] += 1;
        probe_sum += len;
    }

    let stats = DebugStats {
        populated,
        tombstones,
        capacity,
        empty_slots: capacity - populated - tombstones,
        load_factor: populated as f64 / capacity as f64,
        tombstone_ratio: tombstones as f64 / capacity as f64,
        max_probe_length: bins.len() - 1,
        mean_probe_length: if populated == 0 {
            0.0
        } else {
            probe_sum as f64 / populated as f64
        },
        total_bytes,
    };

    if populated == 0 {
        bins.clear();
    }

    (stats, ProbeHistogram { bins })
}
