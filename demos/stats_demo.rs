use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use probe_hash::HashTable;
use probe_hash::IntMap;
use probe_hash::hash_table::Entry;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Remove-then-insert rounds run after the initial fill.
    #[arg(short = 'r', long = "churn_rounds", default_value_t = 10_000)]
    churn_rounds: usize,

    #[arg(short = 's', long = "seed", default_value_t = 0x5eed)]
    seed: u64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn insert(table: &mut HashTable<u64>, value: u64) {
    match table.entry(hash_u64(value), |&v| v == value) {
        Entry::Vacant(entry) => {
            entry.insert(value);
        }
        Entry::Occupied(_) => {
            panic!("Value already exists in table: {}", value);
        }
    }
}

fn main() {
    let args = Args::parse();
    let mut rng = SmallRng::seed_from_u64(args.seed);

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
    println!("Actual capacity: {}", table.capacity());

    // Stay under the growth threshold so the fill never resizes.
    let fill = (table.capacity() / 2).saturating_sub(1);
    let mut live: Vec<u64> = (0..fill as u64).collect();
    for &value in live.iter() {
        insert(&mut table, value);
    }

    println!("Inserted {} values into table", table.len());
    table.probe_histogram().print();
    table.debug_stats().print();

    let mut next = fill as u64;
    let mut rehashes = 0;
    for _ in 0..args.churn_rounds {
        if live.is_empty() {
            break;
        }
        let victim = live.swap_remove(rng.random_range(0..live.len()));
        let before = table.tombstones();
        table.remove(hash_u64(victim), |&v| v == victim);
        if table.tombstones() < before {
            rehashes += 1;
        }

        insert(&mut table, next);
        live.push(next);
        next += 1;
    }

    println!();
    println!(
        "After {} churn rounds ({} tombstone purges):",
        args.churn_rounds, rehashes
    );
    table.probe_histogram().print();
    table.debug_stats().print();

    let mut ints: IntMap<u64, u64> = IntMap::with_capacity(args.target_capacity);
    for key in 0..fill as u64 {
        ints.insert(key, key);
    }
    ints.retain(|key, _| key % 3 != 0);
    for key in 0..fill as u64 / 3 {
        ints.insert(key + fill as u64, key);
    }

    println!();
    println!("IntMap with dense keys after retain and refill:");
    ints.probe_histogram().print();
    ints.debug_stats().print();
}
