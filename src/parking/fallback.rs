//! Portable wait word using a mutex/condvar pair.
//!
//! Less efficient than the futex path but correct everywhere: the waiter
//! re-checks the value while holding the mutex, and wakers take the same
//! mutex before notifying, so a bump cannot slip between the check and the
//! wait.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};

pub(crate) struct WaitWord {
    value: CachePadded<AtomicU32>,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl WaitWord {
    pub(crate) fn new(value: u32) -> Self {
        WaitWord {
            value: CachePadded::new(AtomicU32::new(value)),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    #[inline]
    pub(crate) fn load(&self, order: Ordering) -> u32 {
        self.value.load(order)
    }

    #[inline]
    pub(crate) fn fetch_add(&self, delta: u32, order: Ordering) -> u32 {
        self.value.fetch_add(delta, order)
    }

    #[inline]
    pub(crate) fn fetch_sub(&self, delta: u32, order: Ordering) -> u32 {
        self.value.fetch_sub(delta, order)
    }

    /// Blocks while the value equals `expected`. May return spuriously;
    /// callers loop around their condition.
    pub(crate) fn wait(&self, expected: u32) {
        let guard = self.lock.lock().unwrap();
        if self.value.load(Ordering::Acquire) != expected {
            return;
        }
        let _guard = self.condvar.wait(guard).unwrap();
    }

    /// Wakes at most one waiter.
    pub(crate) fn wake_one(&self) {
        // Taking the mutex orders this wake after any in-progress check.
        drop(self.lock.lock().unwrap());
        self.condvar.notify_one();
    }

    /// Wakes every waiter.
    pub(crate) fn wake_all(&self) {
        drop(self.lock.lock().unwrap());
        self.condvar.notify_all();
    }
}
