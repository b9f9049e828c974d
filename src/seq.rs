use std::cell::{Cell, RefCell};
use std::hash::{BuildHasher, Hash};

use crate::hash::DefaultHashBuilder;
use crate::set::CuckooSet;
use crate::table::Table;

/// The single-threaded reference backend.
///
/// Exists to anchor correctness: the concurrent backends must be
/// indistinguishable from this one under a serial workload. State
/// lives in a `RefCell`, which keeps the shared-interface methods on
/// `&self` and makes the type `!Sync`, so handing it to another thread
/// is a compile error rather than a data race.
///
/// # Examples
///
/// ```
/// use koel::{CuckooSet, SequentialSet};
///
/// let set = SequentialSet::new(16);
/// assert!(set.add(7));
/// assert!(!set.add(7));
/// assert!(set.remove(&7));
/// assert!(set.is_empty());
/// ```
pub struct SequentialSet<T, S = DefaultHashBuilder> {
    table: RefCell<Table<T, S>>,
    // Reentrancy guard: a resize triggered while one is already
    // rehashing is a logic error, not a recursion to absorb.
    resizing: Cell<bool>,
}

impl<T> SequentialSet<T> {
    /// Creates a set with `initial_capacity` slots per table.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, DefaultHashBuilder::default())
    }
}

impl<T> Default for SequentialSet<T> {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CAPACITY)
    }
}

impl<T, S> SequentialSet<T, S> {
    pub fn with_hasher(initial_capacity: usize, hash_builder: S) -> Self {
        SequentialSet {
            table: RefCell::new(Table::with_capacity_and_hasher(
                initial_capacity,
                hash_builder,
            )),
            resizing: Cell::new(false),
        }
    }

    /// Slots per table.
    pub fn capacity(&self) -> usize {
        self.table.borrow().capacity()
    }
}

impl<T: Hash + Eq, S: BuildHasher + Clone> SequentialSet<T, S> {
    fn grow(&self, table: &mut Table<T, S>) {
        assert!(!self.resizing.get(), "resize re-entered during rehash");
        self.resizing.set(true);
        *table = table.grown_successor();
        self.resizing.set(false);
    }
}

impl<T: Hash + Eq, S: BuildHasher + Clone> CuckooSet<T> for SequentialSet<T, S> {
    fn add(&self, key: T) -> bool {
        let mut table = self.table.borrow_mut();
        if table.contains(&key) {
            return false;
        }
        let mut key = key;
        loop {
            match table.insert_chain(key) {
                Ok(()) => return true,
                Err(rejected) => {
                    // Chain bound exhausted; the aborted walk left the
                    // table untouched. Grow and retry from scratch.
                    key = rejected;
                    self.grow(&mut table);
                }
            }
        }
    }

    fn remove(&self, key: &T) -> bool {
        self.table.borrow_mut().take(key).is_some()
    }

    fn contains(&self, key: &T) -> bool {
        self.table.borrow().contains(key)
    }

    fn size(&self) -> usize {
        self.table.borrow().len()
    }
}
