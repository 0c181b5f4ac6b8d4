//! Pool controller.
//!
//! The [`Pool`] owns the workers, the overflow queue, the dispatcher
//! thread, and the shared stop flag. Submission samples a few deques at
//! random and spills to the overflow queue when all of them are full;
//! shutdown wakes everything, joins every thread, and is safe to call more
//! than once.

use crate::job::Job;
use crate::overflow::{self, OverflowQueue};
use crate::rng::fast_random;
use crate::worker::{self, Worker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// A fixed-size work-stealing thread pool.
///
/// # Example
///
/// ```
/// use forgepool::{Job, Pool};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// static DONE: AtomicUsize = AtomicUsize::new(0);
///
/// fn bump(_context: *mut ()) {
///     DONE.fetch_add(1, Ordering::SeqCst);
/// }
///
/// let pool = Pool::with_size(4);
/// // SAFETY: the job carries no context.
/// pool.enqueue(unsafe { Job::new(bump, std::ptr::null_mut()) });
/// # while DONE.load(Ordering::SeqCst) == 0 {
/// #     std::thread::yield_now();
/// # }
/// pool.stop();
/// assert_eq!(DONE.load(Ordering::SeqCst), 1);
/// ```
pub struct Pool {
    workers: Arc<Vec<Worker>>,
    overflow: Arc<OverflowQueue>,
    stop: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Creates a pool with one worker per available core minus one for the
    /// submitting thread, and at least one.
    pub fn new() -> Self {
        let parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Pool::with_size(parallelism.saturating_sub(1).max(1))
    }

    /// Creates a pool with exactly `size` worker threads.
    pub fn with_size(size: usize) -> Self {
        Pool::build(size, false)
    }

    /// Creates a pool with `size` workers pinned linearly to cores for
    /// better cache locality.
    pub fn with_affinity(size: usize) -> Self {
        Pool::build(size, true)
    }

    fn build(size: usize, pin: bool) -> Self {
        assert!(size > 0, "pool size must be at least 1");

        let workers: Arc<Vec<Worker>> =
            Arc::new((0..size).map(|_| Worker::new()).collect());
        let overflow = Arc::new(OverflowQueue::new());
        let stop = Arc::new(AtomicBool::new(false));

        let core_ids = if pin {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut threads = Vec::with_capacity(size + 1);
        for index in 0..size {
            let core_id = if core_ids.is_empty() {
                None
            } else {
                Some(core_ids[index % core_ids.len()])
            };
            threads.push(worker::spawn(
                Arc::clone(&workers),
                index,
                Arc::clone(&stop),
                core_id,
            ));
        }

        threads.push(
            thread::Builder::new()
                .name("forgepool-dispatcher".into())
                .spawn({
                    let queue = Arc::clone(&overflow);
                    let workers = Arc::clone(&workers);
                    let stop = Arc::clone(&stop);
                    move || overflow::run_dispatcher(queue, workers, stop)
                })
                .expect("failed to spawn dispatcher thread"),
        );

        log_debug!("pool started with {} workers", size);

        Pool {
            workers,
            overflow,
            stop,
            threads: Mutex::new(threads),
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submits a job.
    ///
    /// Up to `size` randomly sampled deques are tried; if every sample is
    /// full the job spills into the overflow queue for the dispatcher to
    /// place. Never blocks beyond the queues' short spin sections and never
    /// loses the job.
    ///
    /// Jobs submitted after [`stop`](Self::stop) are still placed but may
    /// never run.
    pub fn enqueue(&self, job: Job) {
        let pool_size = self.workers.len();
        for _ in 0..pool_size {
            let index = fast_random() as usize % pool_size;
            let worker = &self.workers[index];
            if !worker.is_full() {
                worker.push(job);
                return;
            }
        }
        self.overflow.push(job);
    }

    /// Cooperative shutdown: raises the stop flag, wakes the dispatcher and
    /// every sleeping worker, then joins all threads.
    ///
    /// Idempotent. In-flight jobs run to completion; jobs still queued when
    /// the workers observe the flag are discarded.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.overflow.interrupt();
        for worker in self.workers.iter() {
            worker.interrupt();
        }

        let threads = {
            let mut guard = self.threads.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        let mut failed = 0usize;
        for handle in threads {
            if handle.join().is_err() {
                failed += 1;
            }
        }
        if failed > 0 {
            eprintln!("forgepool: {} pool thread(s) panicked", failed);
        }
        log_debug!("pool stopped");
    }
}

impl Default for Pool {
    fn default() -> Self {
        Pool::new()
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.stop();
    }
}
