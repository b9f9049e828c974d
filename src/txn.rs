use std::hash::{BuildHasher, Hash};
use std::mem;

#[cfg(all(feature = "shuttle", test))]
use shuttle::sync::atomic::{AtomicBool, Ordering};
#[cfg(not(all(feature = "shuttle", test)))]
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned};

use crate::error::Contention;
use crate::hash::DefaultHashBuilder;
use crate::lock::OptLock;
use crate::set::CuckooSet;
use crate::table::Table;
use crate::utils::Backoff;

/// The transactional backend.
///
/// Every operation's slot reads and writes execute inside a single
/// atomic region, observed by other threads as one indivisible step.
/// Reads are optimistic: snapshot the version word, read the slots,
/// validate, and retry the whole region on conflict. Writers acquire
/// the version word by compare-and-swap and publish by bumping it on
/// commit. Nothing but slot accesses happens inside a region: keys
/// live inline in the tables, a removed value is dropped only after
/// its region commits, and the displacement journal is preallocated so
/// an insert never allocates mid-region.
///
/// Resizing runs outside any region under a compare-and-set guard;
/// one thread rebuilds the tables while every other backs off until
/// the guard clears. Retired tables are reclaimed through an epoch so
/// a reader still probing the old snapshot never touches freed memory.
///
/// Keys are `Copy`: an optimistic reader can observe a torn slot
/// mid-write, and validation can only discard the value after the read
/// itself was harmless, which plain-old-data guarantees.
///
/// # Examples
///
/// ```
/// use koel::{CuckooSet, TransactionalSet};
///
/// let set = TransactionalSet::new(16);
/// assert!(set.add(3));
/// assert!(set.contains(&3));
/// assert!(!set.add(3));
/// assert!(set.remove(&3));
/// ```
pub struct TransactionalSet<T, S = DefaultHashBuilder> {
    lock: OptLock,
    geometry: Atomic<Table<T, S>>,
    resizing: AtomicBool,
}

unsafe impl<T: Send, S: Send> Send for TransactionalSet<T, S> {}
unsafe impl<T: Send + Sync, S: Send + Sync> Sync for TransactionalSet<T, S> {}

impl<T> TransactionalSet<T> {
    /// Creates a set with `initial_capacity` slots per table.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, DefaultHashBuilder::default())
    }
}

impl<T> Default for TransactionalSet<T> {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CAPACITY)
    }
}

impl<T, S> TransactionalSet<T, S> {
    pub fn with_hasher(initial_capacity: usize, hash_builder: S) -> Self {
        TransactionalSet {
            lock: OptLock::new(),
            geometry: Atomic::new(Table::with_capacity_and_hasher(
                initial_capacity,
                hash_builder,
            )),
            resizing: AtomicBool::new(false),
        }
    }
}

impl<T, S> Drop for TransactionalSet<T, S> {
    fn drop(&mut self) {
        // &mut self: no region can be live, so the pointer is ours.
        let geometry = mem::replace(&mut self.geometry, Atomic::null());
        drop(unsafe { geometry.into_owned() });
    }
}

impl<T: Hash + Eq + Copy, S: BuildHasher + Clone> TransactionalSet<T, S> {
    fn table<'g>(&self, guard: &'g Guard) -> &'g Table<T, S> {
        unsafe { self.geometry.load(Ordering::Acquire, guard).deref() }
    }

    /// Exclusive view of the tables; callers must hold the write lock.
    #[allow(clippy::mut_from_ref)]
    fn table_mut<'g>(&self, guard: &'g Guard) -> &'g mut Table<T, S> {
        let mut shared = self.geometry.load(Ordering::Acquire, guard);
        unsafe { shared.deref_mut() }
    }

    fn try_contains(&self, key: &T, guard: &Guard) -> Result<bool, Contention> {
        let read = self.lock.read()?;
        let found = self.table(guard).probe_racy(key);
        read.check()?;
        Ok(found)
    }

    fn try_size(&self, guard: &Guard) -> Result<usize, Contention> {
        let read = self.lock.read()?;
        let count = self.table(guard).len_racy();
        read.check()?;
        Ok(count)
    }

    /// Rebuilds the tables at doubled capacity. Only one thread
    /// resizes; the rest observe the guard, wait for it to clear and
    /// retry their operation against the new geometry.
    fn resize(&self, seen_capacity: usize, guard: &Guard) {
        if self
            .resizing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let backoff = Backoff::new();
            while self.resizing.load(Ordering::Acquire) {
                backoff.snooze();
            }
            return;
        }
        // Exclude every region while the tables are swapped out.
        let backoff = Backoff::new();
        let write = loop {
            match self.lock.try_write() {
                Ok(write) => break write,
                Err(_) => backoff.spin(),
            }
        };
        let table = self.table_mut(guard);
        if table.capacity() == seen_capacity {
            // Extraction, allocation and rehash all happen out here,
            // under the exclusive guard, not inside any atomic region.
            let next = table.grown_successor();
            let old = self
                .geometry
                .swap(Owned::new(next), Ordering::AcqRel, guard);
            unsafe { guard.defer_destroy(old) };
        }
        write.commit();
        self.resizing.store(false, Ordering::Release);
    }
}

impl<T: Hash + Eq + Copy, S: BuildHasher + Clone> CuckooSet<T> for TransactionalSet<T, S> {
    fn add(&self, key: T) -> bool {
        // Optimistic pre-check keeps the common duplicate case out of
        // the write path entirely.
        if self.contains(&key) {
            return false;
        }
        let guard = epoch::pin();
        let backoff = Backoff::new();
        let mut key = key;
        loop {
            if self.resizing.load(Ordering::Acquire) {
                backoff.snooze();
                continue;
            }
            let write = match self.lock.try_write() {
                Ok(write) => write,
                Err(_) => {
                    backoff.spin();
                    continue;
                }
            };
            let table = self.table_mut(&guard);
            if table.contains(&key) {
                // Lost a race with another add of the same key.
                write.abort();
                return false;
            }
            let seen_capacity = table.capacity();
            let outcome = table.insert_chain(key);
            write.commit();
            match outcome {
                Ok(()) => return true,
                Err(rejected) => {
                    // The chain unwound before the commit, so the
                    // region it published was a no-op. Grow outside
                    // the region and run the whole add again.
                    key = rejected;
                    self.resize(seen_capacity, &guard);
                }
            }
        }
    }

    fn remove(&self, key: &T) -> bool {
        let guard = epoch::pin();
        let backoff = Backoff::new();
        let removed = loop {
            if self.resizing.load(Ordering::Acquire) {
                backoff.snooze();
                continue;
            }
            match self.lock.try_write() {
                Ok(write) => {
                    let taken = self.table_mut(&guard).take(key);
                    if taken.is_some() {
                        write.commit();
                    } else {
                        write.abort();
                    }
                    break taken;
                }
                Err(_) => backoff.spin(),
            }
        };
        // The removed value is released here, after its region
        // committed.
        removed.is_some()
    }

    fn contains(&self, key: &T) -> bool {
        let guard = epoch::pin();
        let backoff = Backoff::new();
        loop {
            match self.try_contains(key, &guard) {
                Ok(found) => return found,
                Err(_) => backoff.spin(),
            }
        }
    }

    fn size(&self) -> usize {
        let guard = epoch::pin();
        let backoff = Backoff::new();
        loop {
            match self.try_size(&guard) {
                Ok(count) => return count,
                Err(_) => backoff.spin(),
            }
        }
    }
}

#[cfg(all(test, not(feature = "shuttle")))]
mod tests {
    use super::*;

    #[test]
    fn add_remove_contains() {
        let set = TransactionalSet::new(16);
        assert!(set.add(7u64));
        assert!(!set.add(7));
        assert!(set.contains(&7));
        assert!(set.remove(&7));
        assert!(!set.remove(&7));
        assert!(!set.contains(&7));
    }

    #[test]
    fn grows_under_pressure() {
        let set = TransactionalSet::new(2);
        for i in 0..128u64 {
            assert!(set.add(i));
        }
        assert_eq!(set.size(), 128);
        for i in 0..128u64 {
            assert!(set.contains(&i));
        }
    }

    #[test]
    fn concurrent_disjoint_adds() {
        use std::sync::Arc;
        use std::thread;

        let set = Arc::new(TransactionalSet::new(4));
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let set = Arc::clone(&set);
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    assert!(set.add(t * 1_000 + i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(set.size(), 2_000);
    }
}
