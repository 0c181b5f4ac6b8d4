//! Bounded Chase-Lev work-stealing deque.
//!
//! Each worker owns one deque. Producers and the dispatcher push at the
//! bottom, the owner pops at the bottom (LIFO), and thieves pop at the top
//! (FIFO). `top` and `bottom` are monotonically increasing 64-bit counters
//! indexing a power-of-two ring; the live slots are `[top, bottom)` and
//! anything outside that range is stale and never read.
//!
//! The delicate case is the last element, which the owner and a thief can
//! claim at the same time. The owner publishes its decremented `bottom` and
//! a thief reads `top` before `bottom`; both run a sequentially consistent
//! fence between the two accesses and settle the claim with a CAS on `top`,
//! so the job is awarded to exactly one side.
//!
//! A per-deque spin flag serializes the writers: pushes arrive from
//! arbitrary producer threads and from the dispatcher, and they overlap the
//! owner's `pop_back`. The flag is held for a few atomic operations at
//! most, never across job execution.

use crate::job::Job;
use crate::spin::SpinLock;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{fence, AtomicI64, Ordering};

/// Ring capacity in jobs. Must stay a power of two for index masking.
pub const CAPACITY: usize = 4096;

/// Fixed-capacity double-ended job queue with one owner and many thieves.
pub struct JobDeque {
    /// Serializes `push`, `pop_back`, and `pop_front`; see the module docs.
    flag: SpinLock<()>,
    bottom: CachePadded<AtomicI64>,
    top: CachePadded<AtomicI64>,
    ring: Box<[UnsafeCell<MaybeUninit<Job>>]>,
}

// SAFETY: ring slots are only read inside `[top, bottom)` under the
// protocol above, and the spin flag serializes every writer.
unsafe impl Send for JobDeque {}
unsafe impl Sync for JobDeque {}

impl JobDeque {
    pub fn new() -> Self {
        let ring = (0..CAPACITY)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        JobDeque {
            flag: SpinLock::new(()),
            bottom: CachePadded::new(AtomicI64::new(0)),
            top: CachePadded::new(AtomicI64::new(0)),
            ring,
        }
    }

    #[inline]
    fn slot(index: i64) -> usize {
        index as usize & (CAPACITY - 1)
    }

    /// Whether the ring has no room left: `bottom - top >= capacity` over
    /// the unbounded counters. Relaxed loads; advisory, may race. Callers
    /// use it to route around a busy deque, not as a hard guarantee.
    pub fn is_full(&self) -> bool {
        self.bottom.load(Ordering::Relaxed) - self.top.load(Ordering::Relaxed)
            >= CAPACITY as i64
    }

    /// Approximate number of queued jobs.
    pub fn len(&self) -> usize {
        let len = self.bottom.load(Ordering::Relaxed) - self.top.load(Ordering::Relaxed);
        len.max(0) as usize
    }

    /// Approximate emptiness. Loads `bottom` before `top` with acquire
    /// ordering, the order the sleep handshake relies on.
    pub fn is_empty(&self) -> bool {
        let b = self.bottom.load(Ordering::Acquire);
        let t = self.top.load(Ordering::Acquire);
        t >= b
    }

    /// Appends a job at the bottom.
    ///
    /// Callers must check [`is_full`](Self::is_full) first and route the
    /// job elsewhere when the ring has no room; there is no blocking push.
    pub fn push(&self, job: Job) {
        let _flag = self.flag.lock();

        let b = self.bottom.load(Ordering::Relaxed);
        debug_assert!(b - self.top.load(Ordering::Relaxed) < CAPACITY as i64);

        // SAFETY: slot `b` is outside the live range until the store to
        // `bottom` below publishes it.
        unsafe { (*self.ring[Self::slot(b)].get()).write(job) };
        self.bottom.store(b + 1, Ordering::Release);
    }

    /// Claims the most recently pushed job (owner side, LIFO).
    pub fn pop_back(&self) -> Option<Job> {
        let _flag = self.flag.lock();

        let b = self.bottom.load(Ordering::Relaxed) - 1;
        self.bottom.store(b, Ordering::Relaxed);

        // Order the `bottom` store against the `top` load; a thief runs the
        // mirrored pair in `pop_front`.
        fence(Ordering::SeqCst);

        let t = self.top.load(Ordering::Relaxed);
        if t > b {
            // Empty; restore the reservation.
            self.bottom.store(b + 1, Ordering::Relaxed);
            return None;
        }

        // SAFETY: `b` is inside `[t, b]`, still unpublished to thieves.
        let job = unsafe { (*self.ring[Self::slot(b)].get()).assume_init_read() };
        if t < b {
            return Some(job);
        }

        // Exactly one element left: settle the race with any thief on
        // `top`. The deque ends empty whichever side wins.
        let won = self
            .top
            .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok();
        self.bottom.store(b + 1, Ordering::Relaxed);
        if won {
            Some(job)
        } else {
            None
        }
    }

    /// Claims the oldest job (thief side, FIFO). A thief that loses the
    /// claim gives up and retries on its next pass.
    pub fn pop_front(&self) -> Option<Job> {
        let _flag = self.flag.lock();

        let t = self.top.load(Ordering::Acquire);
        fence(Ordering::SeqCst);
        let b = self.bottom.load(Ordering::Acquire);
        if t >= b {
            return None;
        }

        // The slot must be read before the CAS publishes the claim, or the
        // owner could recycle it first.
        let job = unsafe { (*self.ring[Self::slot(t)].get()).assume_init_read() };
        if self
            .top
            .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            Some(job)
        } else {
            None
        }
    }
}

impl Default for JobDeque {
    fn default() -> Self {
        JobDeque::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn noop(_context: *mut ()) {}

    /// A job whose context pointer doubles as an identity tag.
    fn tagged(tag: usize) -> Job {
        unsafe { Job::new(noop, tag as *mut ()) }
    }

    fn tag(job: &Job) -> usize {
        job.context() as usize
    }

    #[test]
    fn test_pop_back_is_lifo() {
        let deque = JobDeque::new();
        deque.push(tagged(1));
        deque.push(tagged(2));
        deque.push(tagged(3));

        assert_eq!(deque.pop_back().map(|j| tag(&j)), Some(3));
        assert_eq!(deque.pop_back().map(|j| tag(&j)), Some(2));
        assert_eq!(deque.pop_back().map(|j| tag(&j)), Some(1));
        assert!(deque.pop_back().is_none());
    }

    #[test]
    fn test_pop_front_is_fifo() {
        let deque = JobDeque::new();
        deque.push(tagged(1));
        deque.push(tagged(2));
        deque.push(tagged(3));

        assert_eq!(deque.pop_front().map(|j| tag(&j)), Some(1));
        assert_eq!(deque.pop_front().map(|j| tag(&j)), Some(2));
        assert_eq!(deque.pop_front().map(|j| tag(&j)), Some(3));
        assert!(deque.pop_front().is_none());
    }

    #[test]
    fn test_both_ends_interleaved() {
        let deque = JobDeque::new();
        deque.push(tagged(1));
        deque.push(tagged(2));
        deque.push(tagged(3));

        assert_eq!(deque.pop_back().map(|j| tag(&j)), Some(3));
        assert_eq!(deque.pop_front().map(|j| tag(&j)), Some(1));
        assert_eq!(deque.pop_back().map(|j| tag(&j)), Some(2));
        assert!(deque.is_empty());
    }

    #[test]
    fn test_empty_deque_stays_consistent() {
        let deque = JobDeque::new();
        assert!(deque.is_empty());
        assert!(deque.pop_back().is_none());
        assert!(deque.pop_front().is_none());

        // The failed pop_back must have restored `bottom`.
        deque.push(tagged(9));
        assert_eq!(deque.len(), 1);
        assert_eq!(deque.pop_back().map(|j| tag(&j)), Some(9));
    }

    #[test]
    fn test_fills_at_capacity() {
        let deque = JobDeque::new();
        for i in 0..CAPACITY {
            assert!(!deque.is_full());
            deque.push(tagged(i));
        }
        assert!(deque.is_full());
        assert_eq!(deque.len(), CAPACITY);

        // Draining one slot reopens the ring.
        assert!(deque.pop_front().is_some());
        assert!(!deque.is_full());
    }

    #[test]
    fn test_ring_wraparound() {
        let deque = JobDeque::new();
        // Cycle well past CAPACITY entries through a small resident set so
        // the indices wrap the ring several times.
        for round in 0..3 * CAPACITY {
            deque.push(tagged(round));
            assert_eq!(deque.pop_front().map(|j| tag(&j)), Some(round));
        }
        assert!(deque.is_empty());
    }

    #[test]
    fn test_concurrent_steal_conservation() {
        const ITEMS: usize = 10_000;
        const THIEVES: usize = 4;

        let deque = Arc::new(JobDeque::new());
        let claimed = Arc::new(AtomicUsize::new(0));
        let produced = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Barrier::new(THIEVES + 1));

        let mut handles = vec![];
        for _ in 0..THIEVES {
            let deque = Arc::clone(&deque);
            let claimed = Arc::clone(&claimed);
            let produced = Arc::clone(&produced);
            let done = Arc::clone(&done);
            handles.push(thread::spawn(move || {
                loop {
                    if deque.pop_front().is_some() {
                        claimed.fetch_add(1, Ordering::SeqCst);
                    } else if produced.load(Ordering::SeqCst) == ITEMS && deque.is_empty() {
                        break;
                    } else {
                        thread::yield_now();
                    }
                }
                done.wait();
            }));
        }

        let mut pushed = 0;
        while pushed < ITEMS {
            if !deque.is_full() {
                deque.push(tagged(pushed));
                pushed += 1;
                produced.fetch_add(1, Ordering::SeqCst);
            }
            // Owner competes at the other end as well.
            if deque.pop_back().is_some() {
                claimed.fetch_add(1, Ordering::SeqCst);
            }
        }
        done.wait();
        for h in handles {
            h.join().unwrap();
        }

        // Drain whatever the thieves left behind.
        while deque.pop_back().is_some() {
            claimed.fetch_add(1, Ordering::SeqCst);
        }

        assert_eq!(claimed.load(Ordering::SeqCst), ITEMS, "items lost or duplicated");
    }

    #[test]
    fn test_last_element_awarded_once() {
        const ROUNDS: usize = 500;

        let deque = Arc::new(JobDeque::new());
        let start = Arc::new(Barrier::new(2));
        let finish = Arc::new(Barrier::new(2));
        let thief_wins = Arc::new(AtomicUsize::new(0));

        let thief = {
            let deque = Arc::clone(&deque);
            let start = Arc::clone(&start);
            let finish = Arc::clone(&finish);
            let thief_wins = Arc::clone(&thief_wins);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    start.wait();
                    if deque.pop_front().is_some() {
                        thief_wins.fetch_add(1, Ordering::SeqCst);
                    }
                    finish.wait();
                }
            })
        };

        let mut owner_wins = 0;
        for round in 0..ROUNDS {
            deque.push(tagged(round));
            start.wait();
            if deque.pop_back().is_some() {
                owner_wins += 1;
            }
            finish.wait();
            assert!(deque.is_empty());
        }
        thief.join().unwrap();

        // Every round had exactly one element and exactly one winner.
        assert_eq!(owner_wins + thief_wins.load(Ordering::SeqCst), ROUNDS);
    }
}
