use std::hash::{BuildHasher, Hash};
use std::mem;

use rand::thread_rng;
use smallvec::SmallVec;

use crate::hash::{hash_one, DefaultHashBuilder, Salts};
use crate::set::CuckooSet;
use crate::sync::{Mutex, RwLock};

/// Bounded probe set per slot; a slot never holds more than this many
/// keys.
const PROBE_SIZE: usize = 8;
/// Occupancy at which a slot volunteers an entry for relocation to its
/// alternate.
const RELOCATE_THRESHOLD: usize = 4;

type ProbeSet<T> = SmallVec<[T; PROBE_SIZE]>;

/// The fine-grained locked backend.
///
/// Each slot is a bounded probe set behind its own mutex. An operation
/// on key `k` locks `k`'s two candidate slots in a fixed global order
/// (table 0 before table 1) and inspects them under the held guards,
/// so no lock is ever taken recursively. Relocation moves one element
/// from an over-threshold slot to its alternate while holding both of
/// that element's locks, which means a key never becomes invisible in
/// transit: `add`, `remove` and `contains` are linearizable.
///
/// Resizing excludes every mutator behind a reader/writer barrier and
/// rehashes single-threaded under the write guard; operations either
/// see the pre-resize tables or the post-resize ones, never a mix.
///
/// # Examples
///
/// ```
/// use koel::{CuckooSet, LockedSet};
///
/// let set = LockedSet::new(16);
/// assert!(set.add(1));
/// assert!(set.contains(&1));
/// assert!(set.remove(&1));
/// assert_eq!(set.size(), 0);
/// ```
pub struct LockedSet<T, S = DefaultHashBuilder> {
    core: RwLock<Striped<T>>,
    hash_builder: S,
}

struct Striped<T> {
    slots: [Box<[Mutex<ProbeSet<T>>]>; 2],
    salts: Salts,
    capacity: usize,
    max_relocations: usize,
}

impl<T> Striped<T> {
    fn new(capacity: usize, max_relocations: usize) -> Self {
        let make = || {
            (0..capacity)
                .map(|_| Mutex::new(ProbeSet::new()))
                .collect::<Box<[_]>>()
        };
        Striped {
            slots: [make(), make()],
            salts: Salts::generate(&mut thread_rng()),
            capacity,
            max_relocations,
        }
    }
}

impl<T> LockedSet<T> {
    /// Creates a set with `initial_capacity` slots per table.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, DefaultHashBuilder::default())
    }
}

impl<T> Default for LockedSet<T> {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CAPACITY)
    }
}

impl<T, S> LockedSet<T, S> {
    pub fn with_hasher(initial_capacity: usize, hash_builder: S) -> Self {
        let capacity = initial_capacity.max(1);
        LockedSet {
            core: RwLock::new(Striped::new(capacity, (capacity / 2).max(1))),
            hash_builder,
        }
    }

    /// Slots per table.
    pub fn capacity(&self) -> usize {
        self.core.read().capacity
    }
}

impl<T: Hash + Eq + Clone, S: BuildHasher> LockedSet<T, S> {
    fn slot_pair(&self, core: &Striped<T>, key: &T) -> (usize, usize) {
        let hash = hash_one(&self.hash_builder, key);
        (
            core.salts.index(0, hash, core.capacity),
            core.salts.index(1, hash, core.capacity),
        )
    }

    /// Moves one element at a time out of an over-threshold slot into
    /// its alternate, chasing the overflow across the tables for at
    /// most `max_relocations` rounds. Returns false when a round found
    /// both of a victim's slots full, which only a resize can fix.
    fn relocate(&self, core: &Striped<T>, mut side: usize, mut index: usize) -> bool {
        for _ in 0..core.max_relocations {
            // Peek the oldest entry; the removal below revalidates it
            // under both of its locks.
            let victim = match core.slots[side][index].lock().first() {
                Some(found) => found.clone(),
                None => return true,
            };
            // The victim's slot in `side` is `index`: occupancy implies
            // placement, and the hash is pure.
            let (v0, v1) = self.slot_pair(core, &victim);
            let mut guard0 = core.slots[0][v0].lock();
            let mut guard1 = core.slots[1][v1].lock();
            let (src, dst) = if side == 0 {
                (&mut guard0, &mut guard1)
            } else {
                (&mut guard1, &mut guard0)
            };
            match src.iter().position(|entry| entry == &victim) {
                Some(position) => {
                    let moved = src.remove(position);
                    if dst.len() < RELOCATE_THRESHOLD {
                        dst.push(moved);
                        return true;
                    } else if dst.len() < PROBE_SIZE {
                        // The alternate is itself crowded now; keep
                        // draining from there.
                        dst.push(moved);
                        side = 1 - side;
                        index = if side == 0 { v0 } else { v1 };
                    } else {
                        src.push(moved);
                        return false;
                    }
                }
                None => {
                    // Someone else moved or removed the victim.
                    if src.len() < RELOCATE_THRESHOLD {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Doubles the tables under the write barrier. `seen_capacity` is
    /// the capacity the caller observed when it decided to resize; if
    /// the tables have grown since, the work is already done.
    fn resize(&self, seen_capacity: usize) {
        let mut core = self.core.write();
        if core.capacity != seen_capacity {
            return;
        }
        let capacity = core.capacity * 2;
        let max_relocations = core.max_relocations * 2;
        let old = mem::replace(&mut *core, Striped::new(capacity, max_relocations));
        for slots in &old.slots {
            for slot in slots.iter() {
                for key in mem::take(&mut *slot.lock()) {
                    self.place_rehash(&mut core, key);
                }
            }
        }
    }

    fn place_rehash(&self, core: &mut Striped<T>, key: T) {
        let (i0, i1) = self.slot_pair(core, &key);
        let len0 = core.slots[0][i0].lock().len();
        let len1 = core.slots[1][i1].lock().len();
        let (first, second) = if len0 <= len1 {
            ((0, i0), (1, i1))
        } else {
            ((1, i1), (0, i0))
        };
        for (side, index) in [first, second] {
            let mut slot = core.slots[side][index].lock();
            if slot.len() < PROBE_SIZE {
                slot.push(key);
                return;
            }
        }
        panic!(
            "cuckoo rehash failed: both probe sets full at capacity {}",
            core.capacity
        );
    }
}

impl<T: Hash + Eq + Clone, S: BuildHasher> CuckooSet<T> for LockedSet<T, S> {
    fn add(&self, key: T) -> bool {
        let mut key = Some(key);
        loop {
            let core = self.core.read();
            let (i0, i1) = self.slot_pair(&core, key.as_ref().unwrap());
            let mut set0 = core.slots[0][i0].lock();
            let mut set1 = core.slots[1][i1].lock();
            {
                let k = key.as_ref().unwrap();
                if set0.iter().any(|entry| entry == k) || set1.iter().any(|entry| entry == k) {
                    return false;
                }
            }
            let relocate_from = if set0.len() < RELOCATE_THRESHOLD {
                set0.push(key.take().unwrap());
                None
            } else if set1.len() < RELOCATE_THRESHOLD {
                set1.push(key.take().unwrap());
                None
            } else if set0.len() < PROBE_SIZE {
                set0.push(key.take().unwrap());
                Some((0, i0))
            } else if set1.len() < PROBE_SIZE {
                set1.push(key.take().unwrap());
                Some((1, i1))
            } else {
                // Both probe sets full: only a resize can make room.
                drop(set0);
                drop(set1);
                let seen = core.capacity;
                drop(core);
                self.resize(seen);
                continue;
            };
            drop(set0);
            drop(set1);
            match relocate_from {
                None => return true,
                Some((side, index)) => {
                    // The key is in; relieve the over-threshold slot.
                    let relocated = self.relocate(&core, side, index);
                    let seen = core.capacity;
                    drop(core);
                    if !relocated {
                        self.resize(seen);
                    }
                    return true;
                }
            }
        }
    }

    fn remove(&self, key: &T) -> bool {
        let core = self.core.read();
        let (i0, i1) = self.slot_pair(&core, key);
        let mut set0 = core.slots[0][i0].lock();
        let mut set1 = core.slots[1][i1].lock();
        if let Some(position) = set0.iter().position(|entry| entry == key) {
            set0.remove(position);
            return true;
        }
        if let Some(position) = set1.iter().position(|entry| entry == key) {
            set1.remove(position);
            return true;
        }
        false
    }

    fn contains(&self, key: &T) -> bool {
        let core = self.core.read();
        let (i0, i1) = self.slot_pair(&core, key);
        let set0 = core.slots[0][i0].lock();
        let set1 = core.slots[1][i1].lock();
        set0.iter().any(|entry| entry == key) || set1.iter().any(|entry| entry == key)
    }

    fn size(&self) -> usize {
        let core = self.core.read();
        let mut count = 0;
        for side in &core.slots {
            for slot in side.iter() {
                count += slot.lock().len();
            }
        }
        count
    }
}

#[cfg(all(test, not(feature = "shuttle")))]
mod tests {
    use super::*;

    #[test]
    fn add_remove_contains() {
        let set = LockedSet::new(16);
        assert!(set.add(1u64));
        assert!(!set.add(1));
        assert!(set.contains(&1));
        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert!(!set.contains(&1));
    }

    #[test]
    fn overflow_forces_relocation_and_growth() {
        let set = LockedSet::new(2);
        for i in 0..200u64 {
            assert!(set.add(i));
        }
        assert_eq!(set.size(), 200);
        for i in 0..200u64 {
            assert!(set.contains(&i));
        }
        assert!(set.capacity() > 2);
    }

    #[test]
    fn concurrent_adds_are_all_visible() {
        use std::sync::Arc;
        use std::thread;

        let set = Arc::new(LockedSet::new(4));
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let set = Arc::clone(&set);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    assert!(set.add(t * 1_000 + i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(set.size(), 4_000);
        for t in 0..8u64 {
            for i in 0..500 {
                assert!(set.contains(&(t * 1_000 + i)));
            }
        }
    }
}
