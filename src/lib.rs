//! # Forgepool - Bounded Work-Stealing Thread Pool
//!
//! A fixed-size thread pool that distributes short, opaque jobs across
//! long-lived worker threads using per-worker double-ended queues and
//! work-stealing, in the style of the Chase-Lev deque.
//!
//! ## Architecture
//!
//! - **Jobs**: plain `(fn(*mut ()), *mut ())` pairs; the pool never owns
//!   the context memory.
//! - **Deques**: one bounded ring per worker. The owner pops newest-first
//!   (LIFO); idle peers steal oldest-first (FIFO).
//! - **Overflow queue**: a spin-locked spill queue that absorbs submissions
//!   when every sampled deque is full, drained by a dedicated dispatcher
//!   thread.
//! - **Sleep/wake**: idle workers block on a futex-backed wake word after a
//!   double-checked empty snapshot, so no push is ever missed.
//!
//! `enqueue` never fails and never loses a job; `stop` wakes every thread,
//! joins them all, and is idempotent.
//!
//! ## Example
//!
//! ```
//! use forgepool::{Job, Pool};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! static COUNTER: AtomicUsize = AtomicUsize::new(0);
//!
//! fn increment(_context: *mut ()) {
//!     COUNTER.fetch_add(1, Ordering::SeqCst);
//! }
//!
//! let pool = Pool::new();
//! // SAFETY: the job carries no context.
//! pool.enqueue(unsafe { Job::new(increment, std::ptr::null_mut()) });
//! # while COUNTER.load(Ordering::SeqCst) == 0 {
//! #     std::thread::yield_now();
//! # }
//! pool.stop();
//! ```

#[macro_use]
mod macros;

pub mod deque;
pub mod job;
pub mod pool;

mod overflow;
mod parking;
mod rng;
mod spin;
mod worker;

pub use deque::JobDeque;
pub use job::Job;
pub use pool::Pool;
