/// The abstract set interface every backend implements.
///
/// All methods take `&self`; each backend supplies its own interior
/// mutability and synchronization. The sequential backend is `!Sync`
/// and must stay on one thread; the locked and transactional backends
/// are safe under arbitrary concurrent callers, and their `add`,
/// `remove` and `contains` are linearizable. `size` and `populate` are
/// not: call them only while no other thread is mutating the set.
pub trait CuckooSet<T> {
    /// Inserts `key`. Returns `true` if it was newly inserted, `false`
    /// if it was already present.
    fn add(&self, key: T) -> bool;

    /// Removes `key`. Returns `true` if it was present.
    fn remove(&self, key: &T) -> bool;

    /// Returns true if `key` is in the set.
    fn contains(&self, key: &T) -> bool;

    /// Number of keys in the set. O(capacity): counts occupied slots.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Adds every key in `keys`, returning how many were newly
    /// inserted. Duplicates count as failed adds and are skipped.
    fn populate(&self, keys: &[T]) -> usize
    where
        T: Clone,
    {
        keys.iter().filter(|key| self.add((*key).clone())).count()
    }
}
