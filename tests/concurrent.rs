#![cfg(not(feature = "shuttle"))]

use std::sync::Arc;
use std::thread;

use koel::workload::OpMix;
use koel::{run_workload, CuckooSet, LockedSet, TransactionalSet, WorkloadConfig};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn mixed_workload_config() -> WorkloadConfig {
    WorkloadConfig {
        num_threads: 4,
        num_initial_keys: 1_000,
        total_ops: 40_000,
        value_range: (1, 10_000),
        populate_range: (1, 1_000),
        op_mix: OpMix::default(),
    }
}

#[test]
fn locked_mixed_workload_size_law() {
    let set = LockedSet::new(2_000);
    let report = run_workload(&set, &mixed_workload_config());
    assert_eq!(report.initial_size, 1_000);
    assert!(report.passed, "size law violated:\n{report}");
}

#[test]
fn transactional_mixed_workload_size_law() {
    let set = TransactionalSet::new(2_000);
    let report = run_workload(&set, &mixed_workload_config());
    assert_eq!(report.initial_size, 1_000);
    assert!(report.passed, "size law violated:\n{report}");
}

#[test]
fn locked_write_heavy_workload_size_law() {
    let set = LockedSet::new(64);
    let config = WorkloadConfig {
        num_threads: 8,
        num_initial_keys: 200,
        total_ops: 80_000,
        value_range: (1, 2_000),
        populate_range: (1, 2_000),
        op_mix: OpMix {
            contains: 0.2,
            add: 0.4,
            remove: 0.4,
        },
    };
    let report = run_workload(&set, &config);
    assert!(report.passed, "size law violated:\n{report}");
}

#[test]
fn transactional_write_heavy_workload_size_law() {
    let set = TransactionalSet::new(64);
    let config = WorkloadConfig {
        num_threads: 8,
        num_initial_keys: 200,
        total_ops: 80_000,
        value_range: (1, 2_000),
        populate_range: (1, 2_000),
        op_mix: OpMix {
            contains: 0.2,
            add: 0.4,
            remove: 0.4,
        },
    };
    let report = run_workload(&set, &config);
    assert!(report.passed, "size law violated:\n{report}");
}

#[test]
fn transactional_disjoint_add_remove_pairs() {
    // Eight threads each own one key outside the resident range and
    // flip it in and out; with no contention on the key, every add and
    // every remove must succeed, and the resident keys stay put.
    let set = Arc::new(TransactionalSet::new(256));
    let resident: Vec<u64> = (1..=100).collect();
    assert_eq!(set.populate(&resident), 100);

    let mut handles = Vec::new();
    for t in 0..8u64 {
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            let key = 101 + t;
            let mut adds = 0u32;
            let mut removes = 0u32;
            for _ in 0..10_000 {
                adds += set.add(key) as u32;
                removes += set.remove(&key) as u32;
            }
            (adds, removes)
        }));
    }
    for handle in handles {
        let (adds, removes) = handle.join().unwrap();
        assert_eq!(adds, 10_000);
        assert_eq!(removes, 10_000);
    }
    assert_eq!(set.size(), 100);
    for key in 1..=100 {
        assert!(set.contains(&key));
    }
}

#[test]
fn locked_concurrent_insert_then_read_back() {
    let key_cnt_per_thread = 5_000;
    let w_threads = 4;
    let mut key_space = Vec::with_capacity(key_cnt_per_thread * w_threads);
    for i in 0..key_space.capacity() {
        key_space.push(i as u64);
    }

    let mut rng = StdRng::seed_from_u64(12);
    key_space.shuffle(&mut rng);

    let key_space = Arc::new(key_space);
    let set = Arc::new(LockedSet::new(64));

    let mut handles = Vec::new();
    for t in 0..w_threads {
        let key_space = Arc::clone(&key_space);
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            for i in 0..key_cnt_per_thread {
                let key = key_space[t * key_cnt_per_thread + i];
                assert!(set.add(key));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(set.size(), key_cnt_per_thread * w_threads);
    for key in key_space.iter() {
        assert!(set.contains(key));
    }
}

#[test]
fn readers_overlap_writers_without_blocking_progress() {
    let set = Arc::new(TransactionalSet::new(32));
    for key in 0..500u64 {
        set.add(key);
    }

    let writer = {
        let set = Arc::clone(&set);
        thread::spawn(move || {
            for key in 500..2_000u64 {
                assert!(set.add(key));
            }
        })
    };
    let reader = {
        let set = Arc::clone(&set);
        thread::spawn(move || {
            let mut hits = 0usize;
            for _ in 0..4 {
                for key in 0..500u64 {
                    hits += set.contains(&key) as usize;
                }
            }
            hits
        })
    };

    writer.join().unwrap();
    // Keys 0..500 were never removed; every probe must have hit.
    assert_eq!(reader.join().unwrap(), 2_000);
    assert_eq!(set.size(), 2_000);
}
