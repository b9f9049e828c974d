//! The mixed-workload driver: populates a set with unique keys, hammers
//! it from worker threads with a weighted contains/add/remove mix, and
//! checks the size invariant
//! `expected = initial + successful_adds - successful_removes`.

use std::fmt::{self, Display};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::set::CuckooSet;
use crate::stats::{OpCounts, Stats};

/// Weights over the three operations. Must be non-negative and sum
/// to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OpMix {
    pub contains: f64,
    pub add: f64,
    pub remove: f64,
}

impl Default for OpMix {
    fn default() -> Self {
        OpMix {
            contains: 0.8,
            add: 0.1,
            remove: 0.1,
        }
    }
}

impl OpMix {
    pub fn is_valid(&self) -> bool {
        self.contains >= 0.0
            && self.add >= 0.0
            && self.remove >= 0.0
            && (self.contains + self.add + self.remove - 1.0).abs() < 1e-6
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Worker threads; must be 1 for the sequential backend.
    pub num_threads: usize,
    /// Unique keys to pre-populate.
    pub num_initial_keys: usize,
    /// Operations distributed evenly across the workers.
    pub total_ops: usize,
    /// Inclusive range operation keys are drawn from.
    pub value_range: (u64, u64),
    /// Inclusive range initial keys are drawn from.
    pub populate_range: (u64, u64),
    pub op_mix: OpMix,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            num_threads: 4,
            num_initial_keys: 100_000,
            total_ops: 1_000_000,
            value_range: (1, 100_000),
            populate_range: (1, 100_000),
            op_mix: OpMix::default(),
        }
    }
}

/// Outcome of one workload run against one backend.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub initial_size: usize,
    pub total_ops: usize,
    pub counts: OpCounts,
    pub expected_size: usize,
    pub observed_size: usize,
    pub passed: bool,
    pub elapsed: Duration,
}

impl Display for WorkloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24}{:>10}", "initial elements:", self.initial_size)?;
        writeln!(f, "{:<24}{:>10}", "operations performed:", self.total_ops)?;
        write!(f, "{}", self.counts)?;
        writeln!(f, "{:<24}{:>10}", "expected final size:", self.expected_size)?;
        writeln!(f, "{:<24}{:>10}", "observed final size:", self.observed_size)?;
        writeln!(
            f,
            "{:<24}{:>10}",
            "size check:",
            if self.passed { "PASS" } else { "FAIL" }
        )?;
        writeln!(f, "{:<24}{:>8}ms", "elapsed:", self.elapsed.as_millis())
    }
}

/// Draws `count` distinct keys uniformly from the inclusive `range`.
pub fn unique_keys(range: (u64, u64), count: usize, rng: &mut impl Rng) -> Vec<u64> {
    let (lo, hi) = range;
    assert!(lo <= hi, "empty populate range");
    assert!(
        (hi - lo) as u128 + 1 >= count as u128,
        "populate range cannot produce {count} unique keys"
    );
    let mut seen = ahash::AHashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let key = rng.gen_range(lo..=hi);
        if seen.insert(key) {
            keys.push(key);
        }
    }
    keys
}

/// Adapter that lets the single-threaded reference backend run under
/// the generic driver. Only allow single thread access: configure the
/// driver with exactly one worker.
pub struct SingleThreaded<S>(pub S);

unsafe impl<S: Send> Send for SingleThreaded<S> {}
unsafe impl<S: Send> Sync for SingleThreaded<S> {}

impl<T, S: CuckooSet<T>> CuckooSet<T> for SingleThreaded<S> {
    fn add(&self, key: T) -> bool {
        self.0.add(key)
    }

    fn remove(&self, key: &T) -> bool {
        self.0.remove(key)
    }

    fn contains(&self, key: &T) -> bool {
        self.0.contains(key)
    }

    fn size(&self) -> usize {
        self.0.size()
    }
}

/// Populates `set` and runs the configured mix against it, returning
/// the per-operation counters and the size-invariant verdict.
pub fn run_workload<S>(set: &S, config: &WorkloadConfig) -> WorkloadReport
where
    S: CuckooSet<u64> + Sync,
{
    assert!(config.num_threads >= 1, "need at least one worker");
    assert!(config.op_mix.is_valid(), "op mix weights must sum to 1");
    assert!(
        config.value_range.0 <= config.value_range.1,
        "empty value range"
    );

    let initial_keys = unique_keys(
        config.populate_range,
        config.num_initial_keys,
        &mut thread_rng(),
    );
    let initial_size = set.populate(&initial_keys);

    let stats = Stats::default();
    let ops_per_thread = config.total_ops / config.num_threads;
    let (value_lo, value_hi) = config.value_range;
    let mix = config.op_mix;

    let start = Instant::now();
    std::thread::scope(|scope| {
        for _ in 0..config.num_threads {
            scope.spawn(|| {
                let mut rng = StdRng::from_entropy();
                for _ in 0..ops_per_thread {
                    let key = rng.gen_range(value_lo..=value_hi);
                    let draw = rng.gen::<f64>();
                    if draw < mix.contains {
                        stats.record_contains(set.contains(&key));
                    } else if draw < mix.contains + mix.add {
                        stats.record_add(set.add(key));
                    } else {
                        stats.record_remove(set.remove(&key));
                    }
                }
            });
        }
    });
    let elapsed = start.elapsed();

    let counts = stats.snapshot();
    let expected_size = initial_size + counts.adds_ok as usize - counts.removes_ok as usize;
    let observed_size = set.size();

    WorkloadReport {
        initial_size,
        total_ops: ops_per_thread * config.num_threads,
        counts,
        expected_size,
        observed_size,
        passed: expected_size == observed_size,
        elapsed,
    }
}
