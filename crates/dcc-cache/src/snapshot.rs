//! Swappable read-only snapshot.
//!
//! Readers clone the inner `Arc` under a short read lock and then work on
//! an immutable value; writers build a complete replacement and swap it in.
//! A reader never observes a half-updated snapshot and a refresh never
//! blocks readers for longer than the pointer swap.

use std::sync::Arc;

use parking_lot::RwLock;

/// A value replaced wholesale.
#[derive(Debug)]
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    /// Wrap an initial value.
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The current snapshot.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Replace the snapshot.
    pub fn store(&self, next: T) {
        *self.current.write() = Arc::new(next);
    }
}

impl<T: Clone> Snapshot<T> {
    /// Replace the snapshot with a modified copy of the current one.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut guard = self.current.write();
        let mut next = T::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
