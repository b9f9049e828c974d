//! Lock primitives, swappable for shuttle's instrumented versions.
//!
//! Production builds use parking_lot; under `--features shuttle` the
//! same names resolve to thin wrappers over shuttle's sync types so the
//! model checker can control every acquisition.

#[cfg(not(all(feature = "shuttle", test)))]
pub(crate) use parking_lot::{Mutex, RwLock};

#[cfg(all(feature = "shuttle", test))]
pub(crate) use shim::{Mutex, RwLock};

#[cfg(all(feature = "shuttle", test))]
mod shim {
    pub(crate) struct Mutex<T>(shuttle::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Mutex(shuttle::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> shuttle::sync::MutexGuard<'_, T> {
            self.0.lock().unwrap()
        }
    }

    pub(crate) struct RwLock<T>(shuttle::sync::RwLock<T>);

    impl<T> RwLock<T> {
        pub(crate) fn new(value: T) -> Self {
            RwLock(shuttle::sync::RwLock::new(value))
        }

        pub(crate) fn read(&self) -> shuttle::sync::RwLockReadGuard<'_, T> {
            self.0.read().unwrap()
        }

        pub(crate) fn write(&self) -> shuttle::sync::RwLockWriteGuard<'_, T> {
            self.0.write().unwrap()
        }
    }
}
