//! Global overflow queue and its dispatcher.
//!
//! When a producer finds every sampled deque full, the job spills into this
//! spin-locked queue instead of being dropped or blocking the producer. A
//! dedicated dispatcher thread drains the queue in FIFO order into whichever
//! worker has room, probing linearly from a random starting index.

use crate::job::Job;
use crate::parking::WaitWord;
use crate::rng::fast_random;
use crate::spin::SpinLock;
use crate::worker::Worker;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

pub(crate) struct OverflowQueue {
    jobs: SpinLock<VecDeque<Job>>,
    /// Count of queued jobs; doubles as the dispatcher's wait address.
    remaining: WaitWord,
}

impl OverflowQueue {
    pub(crate) fn new() -> Self {
        OverflowQueue {
            jobs: SpinLock::new(VecDeque::new()),
            remaining: WaitWord::new(0),
        }
    }

    /// Appends a job and wakes the dispatcher. The spin lock is released
    /// before the wake; nothing unbounded happens under it.
    pub(crate) fn push(&self, job: Job) {
        self.jobs.lock().push_back(job);
        self.remaining.fetch_add(1, Ordering::Release);
        self.remaining.wake_one();
    }

    fn pop(&self) -> Option<Job> {
        let mut jobs = self.jobs.lock();
        let job = jobs.pop_front();
        if job.is_some() {
            self.remaining.fetch_sub(1, Ordering::Release);
        }
        job
    }

    /// Unblocks the dispatcher during shutdown: the counter bump makes its
    /// wait predicate false without enqueueing a job.
    pub(crate) fn interrupt(&self) {
        self.remaining.fetch_add(1, Ordering::Release);
        self.remaining.wake_all();
    }
}

/// Dispatcher loop: wait for spilled jobs, then place each into the first
/// non-full worker found by random-start linear probing. Forwarded jobs
/// keep the order in which they overflowed.
pub(crate) fn run_dispatcher(
    queue: Arc<OverflowQueue>,
    workers: Arc<Vec<Worker>>,
    stop: Arc<AtomicBool>,
) {
    let pool_size = workers.len();
    log_debug!("dispatcher started");

    loop {
        while queue.remaining.load(Ordering::Acquire) == 0 {
            if stop.load(Ordering::Relaxed) {
                log_debug!("dispatcher stopping");
                return;
            }
            queue.remaining.wait(0);
        }
        if stop.load(Ordering::Relaxed) {
            log_debug!("dispatcher stopping");
            return;
        }

        let Some(job) = queue.pop() else {
            // Spurious wake-up or a shutdown bump; re-evaluate.
            continue;
        };

        let mut index = fast_random() as usize % pool_size;
        let mut probes = 0;
        while workers[index].is_full() {
            index = (index + 1) % pool_size;
            probes += 1;
            // Under sustained overload every worker can look full; yield
            // instead of spinning through the array forever.
            if probes > pool_size * 2 {
                if stop.load(Ordering::Relaxed) {
                    // Dispatch after shutdown is not guaranteed; the job is
                    // dropped so `stop` can finish joining.
                    log_debug!("dispatcher stopping with a job in hand");
                    return;
                }
                thread::yield_now();
                probes = 0;
            }
        }
        workers[index].push(job);
        log_trace!("dispatcher forwarded a spilled job to worker {}", index);
    }
}
