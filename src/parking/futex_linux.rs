//! Futex-backed wait word.
//!
//! `FUTEX_WAIT` atomically re-checks the word in the kernel, so the
//! bump-then-wake discipline of the callers is enough to rule out lost
//! wake-ups. `FUTEX_PRIVATE_FLAG` skips the cross-process hash lookup.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) struct WaitWord {
    value: CachePadded<AtomicU32>,
}

impl WaitWord {
    pub(crate) fn new(value: u32) -> Self {
        WaitWord {
            value: CachePadded::new(AtomicU32::new(value)),
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
        // SAFETY: the pointer refers to a live AtomicU32 owned by self.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.value.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    /// Wakes at most one waiter.
    pub(crate) fn wake_one(&self) {
        // SAFETY: as in `wait`.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.value.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    /// Wakes every waiter.
    pub(crate) fn wake_all(&self) {
        // SAFETY: as in `wait`.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.value.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                i32::MAX,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}
