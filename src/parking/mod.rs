//! Sleep/wake support for idle workers and the dispatcher.
//!
//! A [`WaitWord`] is a 32-bit atomic counter that doubles as a wait
//! address. Waiters snapshot the value, re-check their condition, and block
//! while the value still equals the snapshot; wakers bump the value before
//! notifying, so a waiter can never sleep through an update it has not seen.
//!
//! On Linux the wait maps straight onto the futex syscall. Other platforms
//! fall back to a mutex/condvar pair with the value re-checked under the
//! mutex.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub(crate) use futex_linux::WaitWord;
    } else {
        mod fallback;
        pub(crate) use fallback::WaitWord;
    }
}
