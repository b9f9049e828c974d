#[cfg(all(feature = "shuttle", test))]
use shuttle::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(all(feature = "shuttle", test)))]
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Contention;

/// Version word guarding the transactional backend's table pair.
///
/// Even value = unlocked; bit 0 is set while a write region holds the
/// lock. Committing a region bumps the version, so any reader that
/// snapshotted before the region started sees its check fail and
/// retries.
pub(crate) struct OptLock {
    version: AtomicUsize,
}

impl OptLock {
    pub(crate) fn new() -> Self {
        OptLock {
            version: AtomicUsize::new(0),
        }
    }

    /// Starts an optimistic read: snapshot the version, fail fast if a
    /// writer is in.
    pub(crate) fn read(&self) -> Result<ReadGuard<'_>, Contention> {
        let version = self.version.load(Ordering::Acquire);
        if version & 1 != 0 {
            return Err(Contention::Locked);
        }
        Ok(ReadGuard {
            lock: self,
            version,
        })
    }

    pub(crate) fn try_write(&self) -> Result<WriteGuard<'_>, Contention> {
        let version = self.version.load(Ordering::Acquire);
        if version & 1 != 0 {
            return Err(Contention::Locked);
        }
        match self.version.compare_exchange_weak(
            version,
            version + 1,
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => Ok(WriteGuard {
                lock: self,
                version: version + 1,
            }),
            Err(_) => Err(Contention::Locked),
        }
    }
}

pub(crate) struct ReadGuard<'a> {
    lock: &'a OptLock,
    version: usize,
}

impl ReadGuard<'_> {
    /// Validates the snapshot: everything read since `read()` was
    /// consistent iff the version has not moved.
    pub(crate) fn check(&self) -> Result<(), Contention> {
        if self.lock.version.load(Ordering::Acquire) == self.version {
            Ok(())
        } else {
            Err(Contention::VersionChanged)
        }
    }
}

pub(crate) struct WriteGuard<'a> {
    lock: &'a OptLock,
    version: usize,
}

impl WriteGuard<'_> {
    /// Publishes the region's writes and invalidates outstanding
    /// readers.
    pub(crate) fn commit(self) {
        self.lock.version.store(self.version + 1, Ordering::Release);
    }

    /// Releases without bumping the version. Only valid when the
    /// region wrote nothing.
    pub(crate) fn abort(self) {
        self.lock.version.store(self.version - 1, Ordering::Release);
    }
}
