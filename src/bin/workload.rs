//! Mixed-workload driver: runs the same 80/10/10 workload against all
//! three backends and verifies
//! `expected = initial + successful_adds - successful_removes` on each.
//! Exits nonzero unless every backend passes.

use std::process::ExitCode;

use koel::workload::OpMix;
use koel::{
    run_workload, LockedSet, SequentialSet, SingleThreaded, TransactionalSet, WorkloadConfig,
    WorkloadReport,
};

// Tunables, in the spirit of a benchmark harness: edit and rebuild.
const NUM_THREADS: usize = 4;
const NUM_INITIAL_KEYS: usize = 100_000;
const TOTAL_OPS: usize = 1_000_000;
const VALUE_RANGE: (u64, u64) = (1, 100_000);
const POPULATE_RANGE: (u64, u64) = (1, 100_000);

fn print_report(name: &str, report: &WorkloadReport) -> bool {
    println!("=== {name} ===");
    print!("{report}");
    println!();
    report.passed
}

fn main() -> ExitCode {
    let config = WorkloadConfig {
        num_threads: NUM_THREADS,
        num_initial_keys: NUM_INITIAL_KEYS,
        total_ops: TOTAL_OPS,
        value_range: VALUE_RANGE,
        populate_range: POPULATE_RANGE,
        op_mix: OpMix::default(),
    };
    let capacity = 2 * NUM_INITIAL_KEYS;
    let mut all_passed = true;

    // The reference backend is not thread-safe; run it on one worker.
    let sequential = SingleThreaded(SequentialSet::<u64>::new(capacity));
    let sequential_config = WorkloadConfig {
        num_threads: 1,
        ..config.clone()
    };
    all_passed &= print_report(
        "sequential cuckoo set",
        &run_workload(&sequential, &sequential_config),
    );

    let locked = LockedSet::<u64>::new(capacity);
    all_passed &= print_report("locked cuckoo set", &run_workload(&locked, &config));

    let transactional = TransactionalSet::<u64>::new(capacity);
    all_passed &= print_report(
        "transactional cuckoo set",
        &run_workload(&transactional, &config),
    );

    if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
