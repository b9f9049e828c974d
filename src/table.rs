use std::hash::{BuildHasher, Hash};
use std::mem;
use std::ptr;

use rand::thread_rng;

use crate::hash::{hash_one, Salts};

/// The single-slot two-table core shared by the sequential and
/// transactional backends. Each slot holds an owned key directly;
/// displacement is a swap of owned values, and the "floating" key is a
/// local the chain moves into each slot in turn.
pub(crate) struct Table<T, S> {
    slots: [Box<[Option<T>]>; 2],
    salts: Salts,
    capacity: usize,
    max_displacements: usize,
    hash_builder: S,
    // Displacement log so an exhausted chain can be unwound. Sized to
    // the chain bound, so pushes never reallocate.
    journal: Vec<(usize, usize)>,
}

fn empty_slots<T>(capacity: usize) -> [Box<[Option<T>]>; 2] {
    let make = || (0..capacity).map(|_| None).collect::<Box<[Option<T>]>>();
    [make(), make()]
}

impl<T, S> Table<T, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let capacity = capacity.max(1);
        Self::new_parts(capacity, (capacity / 2).max(1), hash_builder)
    }

    fn new_parts(capacity: usize, max_displacements: usize, hash_builder: S) -> Self {
        Table {
            slots: empty_slots(capacity),
            salts: Salts::generate(&mut thread_rng()),
            capacity,
            max_displacements,
            hash_builder,
            journal: Vec::with_capacity(2 * max_displacements),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn max_displacements(&self) -> usize {
        self.max_displacements
    }

    pub(crate) fn len(&self) -> usize {
        self.slots
            .iter()
            .flat_map(|side| side.iter())
            .filter(|slot| slot.is_some())
            .count()
    }
}

impl<T: Hash + Eq, S: BuildHasher> Table<T, S> {
    /// Candidate slot indices of `key`: `(h1, h2)` under the current
    /// salts.
    fn index_pair(&self, key: &T) -> (usize, usize) {
        let hash = hash_one(&self.hash_builder, key);
        (
            self.salts.index(0, hash, self.capacity),
            self.salts.index(1, hash, self.capacity),
        )
    }

    pub(crate) fn contains(&self, key: &T) -> bool {
        let (i0, i1) = self.index_pair(key);
        self.slots[0][i0].as_ref() == Some(key) || self.slots[1][i1].as_ref() == Some(key)
    }

    /// Clears the slot holding `key`, handing the removed value back.
    pub(crate) fn take(&mut self, key: &T) -> Option<T> {
        let (i0, i1) = self.index_pair(key);
        if self.slots[0][i0].as_ref() == Some(key) {
            return self.slots[0][i0].take();
        }
        if self.slots[1][i1].as_ref() == Some(key) {
            return self.slots[1][i1].take();
        }
        None
    }

    /// Walks the displacement chain for `key`, table 0 first, one
    /// attempt per table per iteration, up to `max_displacements`
    /// iterations. The caller must have ruled out duplicates.
    ///
    /// On exhaustion every swap is unwound and the original key handed
    /// back, so the table is left exactly as it was and no resident key
    /// is ever lost to an aborted insert.
    pub(crate) fn insert_chain(&mut self, key: T) -> Result<(), T> {
        self.journal.clear();
        let mut floating = key;
        for _ in 0..self.max_displacements {
            for side in 0..2 {
                let hash = hash_one(&self.hash_builder, &floating);
                let index = self.salts.index(side, hash, self.capacity);
                self.journal.push((side, index));
                match mem::replace(&mut self.slots[side][index], Some(floating)) {
                    None => return Ok(()),
                    Some(evicted) => floating = evicted,
                }
            }
        }
        for &(side, index) in self.journal.iter().rev() {
            match mem::replace(&mut self.slots[side][index], Some(floating)) {
                Some(previous) => floating = previous,
                None => unreachable!("journaled slot emptied during unwind"),
            }
        }
        Err(floating)
    }

    /// Removes and returns every resident key.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut keys = Vec::with_capacity(self.len());
        for side in &mut self.slots {
            for slot in side.iter_mut() {
                if let Some(key) = slot.take() {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Builds the successor table for a resize: doubled capacity and
    /// chain bound, fresh salts, same hash builder, every surviving key
    /// re-placed through the normal displacement walk.
    ///
    /// Placement here has to succeed: the doubled geometry holds the
    /// old population at no more than half load. A chain exhausted
    /// during rehash means the hash is broken, which is fatal.
    pub(crate) fn grown_successor(&mut self) -> Self
    where
        S: Clone,
    {
        let mut next = Self::new_parts(
            self.capacity * 2,
            self.max_displacements * 2,
            self.hash_builder.clone(),
        );
        for key in self.drain() {
            if next.insert_chain(key).is_err() {
                panic!(
                    "cuckoo rehash failed: chain bound {} exhausted at capacity {} (was {})",
                    next.max_displacements, next.capacity, self.capacity
                );
            }
        }
        next
    }
}

#[cfg(test)]
impl<T: Hash + Eq, S: BuildHasher> Table<T, S> {
    /// Test hook: every resident key sits at the index its hash and
    /// the current salts dictate.
    pub(crate) fn assert_placement(&self) {
        for side in 0..2 {
            for (index, slot) in self.slots[side].iter().enumerate() {
                if let Some(key) = slot {
                    let hash = hash_one(&self.hash_builder, key);
                    assert_eq!(self.salts.index(side, hash, self.capacity), index);
                }
            }
        }
    }
}

impl<T: Hash + Eq + Copy, S: BuildHasher> Table<T, S> {
    /// Membership probe that tolerates racing writers. Slot values are
    /// read volatile; the caller validates its version snapshot
    /// afterwards and throws away anything read during a race, so a
    /// torn read is never acted on. `Copy` keeps the duplicated bits
    /// free of drop obligations.
    pub(crate) fn probe_racy(&self, key: &T) -> bool {
        let (i0, i1) = self.index_pair(key);
        self.read_slot_racy(0, i0) == Some(*key) || self.read_slot_racy(1, i1) == Some(*key)
    }

    /// Occupied-slot count under the same discipline as `probe_racy`.
    pub(crate) fn len_racy(&self) -> usize {
        let mut count = 0;
        for side in 0..2 {
            for index in 0..self.slots[side].len() {
                if self.read_slot_racy(side, index).is_some() {
                    count += 1;
                }
            }
        }
        count
    }

    fn read_slot_racy(&self, side: usize, index: usize) -> Option<T> {
        match self.slots[side].get(index) {
            Some(slot) => unsafe { ptr::read_volatile(slot) },
            None => None,
        }
    }
}
