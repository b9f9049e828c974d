use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-operation counters shared by the workload workers. Each field
/// is independently atomic; workers update with relaxed stores and the
/// driver reads a snapshot only after joining them.
#[derive(Default)]
pub struct Stats {
    contains_hits: AtomicU64,
    contains_misses: AtomicU64,
    adds_ok: AtomicU64,
    adds_failed: AtomicU64,
    removes_ok: AtomicU64,
    removes_failed: AtomicU64,
}

impl Stats {
    pub fn record_contains(&self, hit: bool) {
        if hit {
            self.contains_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.contains_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_add(&self, ok: bool) {
        if ok {
            self.adds_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.adds_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_remove(&self, ok: bool) {
        if ok {
            self.removes_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.removes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> OpCounts {
        OpCounts {
            contains_hits: self.contains_hits.load(Ordering::Relaxed),
            contains_misses: self.contains_misses.load(Ordering::Relaxed),
            adds_ok: self.adds_ok.load(Ordering::Relaxed),
            adds_failed: self.adds_failed.load(Ordering::Relaxed),
            removes_ok: self.removes_ok.load(Ordering::Relaxed),
            removes_failed: self.removes_failed.load(Ordering::Relaxed),
        }
    }
}

/// A plain snapshot of the workload counters.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct OpCounts {
    pub contains_hits: u64,
    pub contains_misses: u64,
    pub adds_ok: u64,
    pub adds_failed: u64,
    pub removes_ok: u64,
    pub removes_failed: u64,
}

fn success_rate(ok: u64, failed: u64) -> f64 {
    if ok + failed == 0 {
        return 0.0;
    }
    ok as f64 / (ok + failed) as f64 * 100.0
}

impl OpCounts {
    pub fn total(&self) -> u64 {
        self.contains_hits
            + self.contains_misses
            + self.adds_ok
            + self.adds_failed
            + self.removes_ok
            + self.removes_failed
    }

    pub fn contains_hit_rate(&self) -> f64 {
        success_rate(self.contains_hits, self.contains_misses)
    }

    pub fn add_success_rate(&self) -> f64 {
        success_rate(self.adds_ok, self.adds_failed)
    }

    pub fn remove_success_rate(&self) -> f64 {
        success_rate(self.removes_ok, self.removes_failed)
    }
}

impl Display for OpCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "contains  hits: {:>9}   misses: {:>9}   hit rate: {:6.2}%",
            self.contains_hits,
            self.contains_misses,
            self.contains_hit_rate()
        )?;
        writeln!(
            f,
            "add       ok:   {:>9}   failed: {:>9}   success:  {:6.2}%",
            self.adds_ok,
            self.adds_failed,
            self.add_success_rate()
        )?;
        writeln!(
            f,
            "remove    ok:   {:>9}   failed: {:>9}   success:  {:6.2}%",
            self.removes_ok,
            self.removes_failed,
            self.remove_success_rate()
        )
    }
}
